use rand::seq::SliceRandom;
use rand::Rng;

use super::room::normalize_code;
use super::{require_caller, AppState};
use crate::error::{GameError, GameResult};
use crate::types::*;

impl AppState {
    /// Start the game: pick a word, assign roles and speaking order,
    /// open round 1. Everything commits under the room lock or not at
    /// all.
    pub async fn start_game(&self, caller: &str, code: &str) -> GameResult<()> {
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
        if record.room.host_id != caller {
            return Err(GameError::Unauthorized(
                "only the host can start the game".to_string(),
            ));
        }
        let player_count = record.players.len();
        if player_count < self.config.min_players as usize {
            return Err(GameError::InvalidState(format!(
                "at least {} players are needed",
                self.config.min_players
            )));
        }

        let categories = self.catalog.categories().await;
        let with_words: Vec<_> = categories
            .into_iter()
            .filter(|c| !c.words.is_empty())
            .collect();
        if with_words.is_empty() {
            return Err(GameError::NotFound(
                "no categories with words available".to_string(),
            ));
        }

        let mut rng = rand::rng();
        let category = &with_words[rng.random_range(0..with_words.len())];
        let word = &category.words[rng.random_range(0..category.words.len())];

        // Uniform speaking order, uniform impostor slot within it
        let mut order: Vec<usize> = (0..player_count).collect();
        order.shuffle(&mut rng);
        let impostor_slot = rng.random_range(0..player_count);

        for (slot, &player_idx) in order.iter().enumerate() {
            let player = &mut record.players[player_idx];
            player.turn_order = Some(slot as u32);
            player.role = if slot == impostor_slot {
                PlayerRole::Impostor
            } else {
                PlayerRole::Civilian
            };
        }

        let round = Round {
            id: ulid::Ulid::new().to_string(),
            room_id: record.room.id.clone(),
            round_num: record.rounds.len() as u32 + 1,
            word_id: word.id.clone(),
            impostor_guess: None,
            impostor_guessed_correct: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        record.rounds.push(round);

        record.room.status = RoomStatus::Playing;
        record.room.current_turn_index = Some(0);

        tracing::info!(
            code = %code,
            players = player_count,
            category = %category.name,
            "game started"
        );
        Ok(())
    }

    /// Advance the speaking turn. Any signed-in caller may do this (an
    /// external timer typically drives it on timeout); the index keeps
    /// incrementing past the player count, which derives the voting
    /// phase. Returns the new index.
    pub async fn advance_turn(&self, caller: &str, code: &str) -> GameResult<u32> {
        require_caller(caller)?;
        let code = normalize_code(code)?;

        let handle = self.room_handle(&code).await?;
        let mut record = handle.lock().await;
        record.ensure_live()?;

        if record.room.status != RoomStatus::Playing {
            return Err(GameError::InvalidState(
                "the room is not in a running game".to_string(),
            ));
        }

        let next = record.room.current_turn_index.unwrap_or(0) + 1;
        record.room.current_turn_index = Some(next);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::new(Arc::new(StaticCatalog::with_seed()))
    }

    async fn room_with_players(state: &AppState, n: usize) -> String {
        let code = state.create_room("user_0").await.unwrap();
        for i in 1..n {
            state.join_room(&format!("user_{i}"), &code).await.unwrap();
        }
        code
    }

    #[tokio::test]
    async fn test_start_game_preconditions() {
        let state = state();
        let code = room_with_players(&state, 2).await;

        assert!(matches!(
            state.start_game("user_0", &code).await,
            Err(GameError::InvalidState(_)) // not enough players
        ));

        state.join_room("user_2", &code).await.unwrap();
        assert!(matches!(
            state.start_game("user_1", &code).await,
            Err(GameError::Unauthorized(_)) // not the host
        ));

        state.start_game("user_0", &code).await.unwrap();
        assert!(matches!(
            state.start_game("user_0", &code).await,
            Err(GameError::InvalidState(_)) // already started
        ));
    }

    #[tokio::test]
    async fn test_start_game_assigns_roles_order_and_round() {
        let state = state();
        let code = room_with_players(&state, 5).await;
        state.start_game("user_0", &code).await.unwrap();

        let handle = state.store.get(&code).await.unwrap();
        let record = handle.lock().await;

        assert_eq!(record.room.status, RoomStatus::Playing);
        assert_eq!(record.room.current_turn_index, Some(0));

        // Exactly one impostor
        let impostors = record
            .players
            .iter()
            .filter(|p| p.role == PlayerRole::Impostor)
            .count();
        assert_eq!(impostors, 1);

        // Turn order is a permutation of 0..n
        let orders: HashSet<_> = record
            .players
            .iter()
            .map(|p| p.turn_order.expect("assigned"))
            .collect();
        assert_eq!(orders, (0..5).collect::<HashSet<u32>>());

        // Round 1 exists and points at a word from the catalog
        assert_eq!(record.rounds.len(), 1);
        let round = &record.rounds[0];
        assert_eq!(round.round_num, 1);
        assert!(state.catalog.lookup(&round.word_id).await.is_some());
        assert_eq!(round.impostor_guess, None);
    }

    #[tokio::test]
    async fn test_start_game_fails_on_empty_catalog() {
        let state = AppState::new(Arc::new(StaticCatalog::new(Vec::new())));
        let code = room_with_players(&state, 3).await;

        assert!(matches!(
            state.start_game("user_0", &code).await,
            Err(GameError::NotFound(_))
        ));
        // Nothing was partially applied
        let handle = state.store.get(&code).await.unwrap();
        let record = handle.lock().await;
        assert_eq!(record.room.status, RoomStatus::Waiting);
        assert!(record.rounds.is_empty());
        assert!(record.players.iter().all(|p| p.turn_order.is_none()));
    }

    #[tokio::test]
    async fn test_advance_turn_increments_and_nothing_else() {
        let state = state();
        let code = room_with_players(&state, 3).await;

        assert!(matches!(
            state.advance_turn("user_1", &code).await,
            Err(GameError::InvalidState(_)) // still waiting
        ));

        state.start_game("user_0", &code).await.unwrap();
        let before = state.room_snapshot(&code).await.unwrap();

        for expected in 1..=4 {
            let idx = state.advance_turn("user_1", &code).await.unwrap();
            assert_eq!(idx, expected);
        }

        let after = state.room_snapshot(&code).await.unwrap();
        assert_eq!(after.room.current_turn_index, Some(4));
        // No other field perturbed
        assert_eq!(after.room.status, before.room.status);
        assert_eq!(after.room.host_id, before.room.host_id);
        assert_eq!(after.room.tiebreak_player_ids, before.room.tiebreak_player_ids);
        assert_eq!(
            after.players.iter().map(|p| &p.id).collect::<Vec<_>>(),
            before.players.iter().map(|p| &p.id).collect::<Vec<_>>()
        );
    }
}
