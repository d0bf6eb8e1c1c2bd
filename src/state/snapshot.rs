//! Read model for polling observers.
//!
//! There is no push channel: clients discover state changes by
//! re-reading the room, so this query must be cheap, side-effect free
//! and safe to repeat at any cadence.

use serde::Serialize;

use super::phase::derive_phase;
use super::room::normalize_code;
use super::AppState;
use crate::error::GameResult;
use crate::types::*;

/// The latest round joined with its resolved word and votes.
#[derive(Debug, Clone, Serialize)]
pub struct RoundView {
    pub round: Round,
    /// `None` if the catalog no longer knows the word
    pub word_text: Option<String>,
    pub category_name: Option<String>,
    pub votes: Vec<Vote>,
}

/// Full current view of one room.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshot {
    pub room: Room,
    /// Derived, never stored (see `derive_phase`)
    pub phase: RoomPhase,
    /// Ordered by speaking slot; players without one come last, in join order
    pub players: Vec<Player>,
    pub round: Option<RoundView>,
}

impl AppState {
    pub async fn room_snapshot(&self, code: &str) -> GameResult<RoomSnapshot> {
        let code = normalize_code(code)?;
        let handle = self.room_handle(&code).await?;
        let record = handle.lock().await;
        record.ensure_live()?;

        let mut players = record.players.clone();
        players.sort_by_key(|p| p.turn_order.map_or(u32::MAX, |t| t));

        let round = record.latest_round().cloned();
        let votes: Vec<Vote> = round
            .as_ref()
            .map(|r| record.votes_for_round(&r.id).cloned().collect())
            .unwrap_or_default();
        let phase = derive_phase(
            record.room.status,
            record.room.current_turn_index,
            record.players.len(),
            votes.len(),
            record.room.tiebreak_player_ids.len(),
            record.room.tiebreak_defense_idx,
        );
        let room = record.room.clone();
        // Word resolution goes through the catalog, which may be slow;
        // release the room before asking it.
        drop(record);

        let round = match round {
            Some(round) => {
                let entry = self.catalog.lookup(&round.word_id).await;
                Some(RoundView {
                    word_text: entry.as_ref().map(|e| e.word.text.clone()),
                    category_name: entry.map(|e| e.category),
                    votes,
                    round,
                })
            }
            None => None,
        };

        Ok(RoomSnapshot {
            room,
            phase,
            players,
            round,
        })
    }
}
