use rand::Rng;

use super::{require_caller, AppState, RoomRecord};
use crate::error::{GameError, GameResult};
use crate::types::*;

/// Safe character set for room codes (excludes 0/O and 1/I to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 4;

/// Generate a random room code (4 characters)
fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Normalize caller-supplied codes: case-insensitive on input, stored
/// uppercase, 4 alphanumeric characters.
pub(crate) fn normalize_code(input: &str) -> GameResult<String> {
    let code = input.trim().to_uppercase();
    if code.len() != CODE_LENGTH || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(GameError::Validation(
            "the code must be 4 letters or digits".to_string(),
        ));
    }
    Ok(code)
}

impl AppState {
    /// Create a room with the caller as host and first player.
    /// Returns the room code.
    pub async fn create_room(&self, caller: &str) -> GameResult<String> {
        require_caller(caller)?;

        for _ in 0..self.config.code_attempts {
            let code = generate_room_code();
            let room = Room {
                id: ulid::Ulid::new().to_string(),
                code: code.clone(),
                host_id: caller.to_string(),
                status: RoomStatus::Waiting,
                current_turn_index: None,
                tiebreak_player_ids: Vec::new(),
                tiebreak_defense_idx: None,
                tiebreak_started_at: None,
                created_at: chrono::Utc::now().to_rfc3339(),
            };
            let room_id = room.id.clone();
            let mut record = RoomRecord::new(room);
            record.players.push(Player::new(caller, &room_id));

            // The store re-checks the code under its write lock, so a
            // false return here is a genuine collision - try again.
            if self.store.insert_if_vacant(record).await {
                tracing::info!(code = %code, host = %caller, "room created");
                return Ok(code);
            }
        }

        Err(GameError::Conflict(
            "could not generate a unique room code".to_string(),
        ))
    }

    /// Join a waiting room. Joining a room the caller is already in is a
    /// no-op success. Returns the normalized room code.
    pub async fn join_room(&self, caller: &str, code: &str) -> GameResult<String> {
        require_caller(caller)?;
        let code = normalize_code(code)?;

        let handle = self.room_handle(&code).await?;
        let mut record = handle.lock().await;
        record.ensure_live()?;

        if record.room.status != RoomStatus::Waiting {
            return Err(GameError::InvalidState(
                "the game has already started".to_string(),
            ));
        }
        if record.player_for_user(caller).is_some() {
            return Ok(code);
        }
        if let Some(max) = self.config.max_players {
            if record.players.len() >= max as usize {
                return Err(GameError::Conflict("the room is full".to_string()));
            }
        }

        let room_id = record.room.id.clone();
        record.players.push(Player::new(caller, &room_id));
        Ok(code)
    }

    /// Leave a room. Succeeds even if the caller was not a member. An
    /// emptied room is deleted outright; a departing host hands the room
    /// to the earliest remaining player by join order.
    pub async fn leave_room(&self, caller: &str, code: &str) -> GameResult<()> {
        require_caller(caller)?;
        let code = normalize_code(code)?;

        let handle = self.room_handle(&code).await?;
        let mut record = handle.lock().await;
        record.ensure_live()?;

        let Some(pos) = record.players.iter().position(|p| p.user_id == caller) else {
            return Ok(());
        };
        let player_id = record.players.remove(pos).id;

        // Cascade: votes cast by or aimed at the departed player are
        // meaningless now, as is their slot in a tied set.
        record
            .votes
            .retain(|v| v.caster_id != player_id && v.target_id != player_id);
        if record.room.tiebreak_player_ids.contains(&player_id) {
            record.room.tiebreak_player_ids.retain(|id| *id != player_id);
            if record.room.tiebreak_player_ids.len() < 2 {
                record.room.tiebreak_player_ids.clear();
                record.room.tiebreak_defense_idx = None;
                record.room.tiebreak_started_at = None;
            }
        }

        if record.players.is_empty() {
            record.deleted = true;
            drop(record);
            self.store.remove(&code).await;
            tracing::info!(code = %code, "last player left, room deleted");
            return Ok(());
        }

        if record.room.host_id == caller {
            // Join order is the vec order, so the first entry is the
            // deterministic successor.
            if let Some(next_host) = record.players.first() {
                record.room.host_id = next_host.user_id.clone();
                tracing::info!(code = %code, new_host = %record.room.host_id, "host left, transferred");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::new(Arc::new(StaticCatalog::with_seed()))
    }

    #[tokio::test]
    async fn test_create_room_seeds_host_player() {
        let state = state();
        let code = state.create_room("user_host").await.unwrap();

        assert_eq!(code.len(), 4);
        assert!(code.chars().all(|c| CODE_CHARS.contains(&(c as u8))));

        let handle = state.store.get(&code).await.unwrap();
        let record = handle.lock().await;
        assert_eq!(record.room.host_id, "user_host");
        assert_eq!(record.room.status, RoomStatus::Waiting);
        assert_eq!(record.players.len(), 1);
        assert_eq!(record.players[0].role, PlayerRole::Civilian);
        assert_eq!(record.players[0].turn_order, None);
    }

    #[tokio::test]
    async fn test_join_is_case_insensitive_and_idempotent() {
        let state = state();
        let code = state.create_room("user_host").await.unwrap();

        let joined = state.join_room("user_2", &code.to_lowercase()).await.unwrap();
        assert_eq!(joined, code);

        // Second join creates no duplicate player
        state.join_room("user_2", &code).await.unwrap();
        let handle = state.store.get(&code).await.unwrap();
        assert_eq!(handle.lock().await.players.len(), 2);
    }

    #[tokio::test]
    async fn test_join_validations() {
        let state = state();
        let code = state.create_room("user_host").await.unwrap();

        assert!(matches!(
            state.join_room("user_2", "toolong").await,
            Err(GameError::Validation(_))
        ));
        assert!(matches!(
            state.join_room("user_2", "ZZZZ").await,
            Err(GameError::NotFound(_))
        ));

        state.join_room("user_2", &code).await.unwrap();
        state.join_room("user_3", &code).await.unwrap();
        state.start_game("user_host", &code).await.unwrap();
        assert!(matches!(
            state.join_room("user_4", &code).await,
            Err(GameError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_join_respects_max_players() {
        let config = GameConfig {
            max_players: Some(2),
            ..GameConfig::default()
        };
        let state = AppState::with_config(Arc::new(StaticCatalog::with_seed()), config);
        let code = state.create_room("user_host").await.unwrap();

        state.join_room("user_2", &code).await.unwrap();
        assert!(matches!(
            state.join_room("user_3", &code).await,
            Err(GameError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_leave_drains_to_delete() {
        let state = state();
        let code = state.create_room("user_host").await.unwrap();

        state.leave_room("user_host", &code).await.unwrap();
        assert!(state.store.get(&code).await.is_none());
    }

    #[tokio::test]
    async fn test_leave_transfers_host_deterministically() {
        let state = state();
        let code = state.create_room("user_host").await.unwrap();
        state.join_room("user_2", &code).await.unwrap();
        state.join_room("user_3", &code).await.unwrap();

        state.leave_room("user_host", &code).await.unwrap();

        let handle = state.store.get(&code).await.unwrap();
        let record = handle.lock().await;
        // Earliest remaining joiner inherits the room
        assert_eq!(record.room.host_id, "user_2");
        assert_eq!(record.players.len(), 2);
    }

    #[tokio::test]
    async fn test_leave_is_noop_for_non_members() {
        let state = state();
        let code = state.create_room("user_host").await.unwrap();

        state.leave_room("user_stranger", &code).await.unwrap();
        let handle = state.store.get(&code).await.unwrap();
        assert_eq!(handle.lock().await.players.len(), 1);
    }

    #[tokio::test]
    async fn test_leave_keeps_turn_order_slots() {
        let state = state();
        let code = state.create_room("user_host").await.unwrap();
        state.join_room("user_2", &code).await.unwrap();
        state.join_room("user_3", &code).await.unwrap();
        state.join_room("user_4", &code).await.unwrap();
        state.start_game("user_host", &code).await.unwrap();

        let before: Vec<_> = {
            let handle = state.store.get(&code).await.unwrap();
            let record = handle.lock().await;
            record
                .players
                .iter()
                .filter(|p| p.user_id != "user_3")
                .map(|p| (p.user_id.clone(), p.turn_order))
                .collect()
        };

        state.leave_room("user_3", &code).await.unwrap();

        let handle = state.store.get(&code).await.unwrap();
        let record = handle.lock().await;
        let after: Vec<_> = record
            .players
            .iter()
            .map(|p| (p.user_id.clone(), p.turn_order))
            .collect();
        assert_eq!(before, after);
    }
}
