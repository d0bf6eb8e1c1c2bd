use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type RoomId = String;
pub type PlayerId = String;
pub type RoundId = String;
pub type VoteId = String;
pub type UserId = String;
pub type WordId = String;
pub type CategoryId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerRole {
    Civilian,
    Impostor,
}

/// Fine-grained view of where a room currently is.
///
/// Only `RoomStatus` is persisted; everything between `Waiting` and
/// `Finished` is derived from the turn index, the vote count and the
/// tiebreak fields (see `state::derive_phase`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomPhase {
    Waiting,
    Turns,
    Voting,
    TiebreakDefense,
    TiebreakRevote,
    Guess,
    Finished,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    /// Human-enterable join code, stored uppercase, unique across rooms
    pub code: String,
    pub host_id: UserId,
    pub status: RoomStatus,
    /// Index of the active speaker; `None` until the game starts.
    /// Reaching the player count means the room is in the voting phase.
    pub current_turn_index: Option<u32>,
    /// Players tied for most votes; empty unless a tiebreak is active
    pub tiebreak_player_ids: Vec<PlayerId>,
    /// Position in the defense rotation. Equal to the tied-set length
    /// once every defender has spoken (sentinel: awaiting revote).
    pub tiebreak_defense_idx: Option<u32>,
    /// When the current defense slot started (ISO8601)
    pub tiebreak_started_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub user_id: UserId,
    pub room_id: RoomId,
    pub role: PlayerRole,
    /// Speaking slot, assigned at game start as a permutation of 0..n-1
    pub turn_order: Option<u32>,
    pub score: u32,
    pub joined_at: String,
}

impl Player {
    pub fn new(user_id: &str, room_id: &RoomId) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            user_id: user_id.to_string(),
            room_id: room_id.clone(),
            role: PlayerRole::Civilian,
            turn_order: None,
            score: 0,
            joined_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub room_id: RoomId,
    /// 1-based; single-round games today, so this is always 1
    pub round_num: u32,
    pub word_id: WordId,
    pub impostor_guess: Option<String>,
    pub impostor_guessed_correct: Option<bool>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub round_id: RoundId,
    pub caster_id: PlayerId,
    pub target_id: PlayerId,
    pub ts: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    pub id: WordId,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub words: Vec<Word>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Minimum players required to start a game
    pub min_players: u32,
    /// Optional room size ceiling; `None` leaves size policy to the caller
    pub max_players: Option<u32>,
    /// Advisory speaking-slot duration for external turn timers
    pub turn_seconds: u32,
    /// How many room codes to try before giving up on creation
    pub code_attempts: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: 3,
            max_players: None,
            turn_seconds: 60,
            code_attempts: 20,
        }
    }
}

impl GameConfig {
    /// Load config from environment variables, falling back to defaults.
    /// Recognized: IMPOSTOR_MIN_PLAYERS, IMPOSTOR_MAX_PLAYERS,
    /// IMPOSTOR_TURN_SECONDS.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(n) = env_u32("IMPOSTOR_MIN_PLAYERS") {
            if n >= 2 {
                config.min_players = n;
            } else {
                tracing::warn!("IMPOSTOR_MIN_PLAYERS must be at least 2, keeping default");
            }
        }
        if let Some(n) = env_u32("IMPOSTOR_MAX_PLAYERS") {
            config.max_players = Some(n);
        }
        if let Some(n) = env_u32("IMPOSTOR_TURN_SECONDS") {
            config.turn_seconds = n;
        }
        config
    }
}

fn env_u32(name: &str) -> Option<u32> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!("Ignoring unparseable {}={:?}", name, raw);
            None
        }
    }
}
