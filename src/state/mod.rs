mod game;
mod phase;
mod room;
mod score;
mod snapshot;
mod store;
mod vote;

pub use phase::derive_phase;
pub use snapshot::{RoomSnapshot, RoundView};
pub use store::{RoomRecord, RoomStore};
pub use vote::TiebreakOutcome;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::catalog::WordCatalog;
use crate::error::{GameError, GameResult};
use crate::types::GameConfig;

/// Shared application state: the room store plus external collaborators.
///
/// All game operations are methods on this type, split across the
/// modules above by concern.
pub struct AppState {
    pub store: RoomStore,
    pub catalog: Arc<dyn WordCatalog>,
    pub config: GameConfig,
}

impl AppState {
    pub fn new(catalog: Arc<dyn WordCatalog>) -> Self {
        Self::with_config(catalog, GameConfig::default())
    }

    pub fn with_config(catalog: Arc<dyn WordCatalog>, config: GameConfig) -> Self {
        Self {
            store: RoomStore::new(),
            catalog,
            config,
        }
    }

    /// Resolve a (normalized) code to its room handle.
    pub(crate) async fn room_handle(&self, code: &str) -> GameResult<Arc<Mutex<RoomRecord>>> {
        self.store
            .get(code)
            .await
            .ok_or_else(|| GameError::NotFound("room not found".to_string()))
    }
}

/// Reject blank caller identities before touching any state.
pub(crate) fn require_caller(user_id: &str) -> GameResult<()> {
    if user_id.trim().is_empty() {
        Err(GameError::Unauthenticated)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;

    #[tokio::test]
    async fn test_state_starts_empty() {
        let state = AppState::new(Arc::new(StaticCatalog::with_seed()));
        assert!(state.store.is_empty().await);
        assert_eq!(state.config.min_players, 3);
    }

    #[tokio::test]
    async fn test_blank_caller_is_rejected_everywhere() {
        let state = AppState::new(Arc::new(StaticCatalog::with_seed()));

        assert_eq!(state.create_room("").await, Err(GameError::Unauthenticated));
        assert_eq!(
            state.join_room("  ", "ABCD").await,
            Err(GameError::Unauthenticated)
        );
        assert_eq!(
            state.leave_room("", "ABCD").await,
            Err(GameError::Unauthenticated)
        );
        assert_eq!(
            state.start_game("", "ABCD").await,
            Err(GameError::Unauthenticated)
        );
        assert_eq!(
            state.advance_turn("", "ABCD").await,
            Err(GameError::Unauthenticated)
        );
    }
}
