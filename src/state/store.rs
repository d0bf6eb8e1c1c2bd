//! Keyed room storage with an explicit per-room serialization boundary.
//!
//! Every room lives behind its own `Mutex`; an operation locks the one
//! room it touches for its whole read-validate-mutate sequence, so
//! concurrent mutations of a single room serialize while different rooms
//! never contend. The outer registry lock is only held for lookup,
//! insert and remove.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::error::{GameError, GameResult};
use crate::types::*;

/// One room's full entity graph. The room owns its players, rounds and
/// votes; dropping the record is the cascade delete.
#[derive(Debug, Clone)]
pub struct RoomRecord {
    pub room: Room,
    /// In join order; never reordered (turn order is a field, not position)
    pub players: Vec<Player>,
    pub rounds: Vec<Round>,
    pub votes: Vec<Vote>,
    /// Set under the room lock right before the registry entry goes away,
    /// so an operation that already cloned the `Arc` sees the deletion
    /// instead of mutating an orphan.
    pub deleted: bool,
}

impl RoomRecord {
    pub fn new(room: Room) -> Self {
        Self {
            room,
            players: Vec::new(),
            rounds: Vec::new(),
            votes: Vec::new(),
            deleted: false,
        }
    }

    /// Fail with `NotFound` if this record was tombstoned concurrently.
    pub fn ensure_live(&self) -> GameResult<()> {
        if self.deleted {
            Err(GameError::NotFound("room not found".to_string()))
        } else {
            Ok(())
        }
    }

    pub fn player_for_user(&self, user_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    pub fn contains_player(&self, player_id: &str) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }

    pub fn round_by_id(&self, round_id: &str) -> Option<&Round> {
        self.rounds.iter().find(|r| r.id == round_id)
    }

    /// The most recent round, i.e. the highest round number.
    pub fn latest_round(&self) -> Option<&Round> {
        self.rounds.iter().max_by_key(|r| r.round_num)
    }

    pub fn votes_for_round<'a>(&'a self, round_id: &'a str) -> impl Iterator<Item = &'a Vote> + 'a {
        self.votes.iter().filter(move |v| v.round_id == round_id)
    }

    pub fn vote_count(&self, round_id: &str) -> usize {
        self.votes_for_round(round_id).count()
    }

    pub fn purge_votes(&mut self, round_id: &str) {
        self.votes.retain(|v| v.round_id != round_id);
    }
}

/// Registry of all live rooms, keyed by their join code.
pub struct RoomStore {
    rooms: RwLock<HashMap<String, Arc<Mutex<RoomRecord>>>>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a record unless its code is already taken. The check and
    /// the insert happen under one write lock, which is what makes room
    /// code generation collision-safe.
    pub async fn insert_if_vacant(&self, record: RoomRecord) -> bool {
        let code = record.room.code.clone();
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&code) {
            return false;
        }
        rooms.insert(code, Arc::new(Mutex::new(record)));
        true
    }

    pub async fn get(&self, code: &str) -> Option<Arc<Mutex<RoomRecord>>> {
        self.rooms.read().await.get(code).cloned()
    }

    pub async fn remove(&self, code: &str) {
        self.rooms.write().await.remove(code);
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }
}

impl Default for RoomStore {
    fn default() -> Self {
        Self::new()
    }
}
