use super::room::normalize_code;
use super::{require_caller, AppState};
use crate::error::{GameError, GameResult};
use crate::types::*;

impl AppState {
    /// Adjudicate the impostor's final guess. Correct (case-insensitive,
    /// whitespace-trimmed) means the impostor scores; wrong means every
    /// civilian scores. Either way the room finishes. Returns whether
    /// the guess was correct.
    pub async fn submit_guess(
        &self,
        caller: &str,
        code: &str,
        round_id: &str,
        guess: &str,
    ) -> GameResult<bool> {
        require_caller(caller)?;
        let code = normalize_code(code)?;
        let guess = guess.trim().to_string();
        if guess.is_empty() {
            return Err(GameError::Validation("write the word".to_string()));
        }

        let handle = self.room_handle(&code).await?;
        let mut record = handle.lock().await;
        record.ensure_live()?;

        let round_idx = record
            .rounds
            .iter()
            .position(|r| r.id == round_id)
            .ok_or_else(|| GameError::NotFound("round not found".to_string()))?;

        let impostor_id = match record.player_for_user(caller) {
            Some(p) if p.role == PlayerRole::Impostor => p.id.clone(),
            _ => {
                return Err(GameError::Unauthorized(
                    "you are not the impostor".to_string(),
                ))
            }
        };

        // The guess ends the game, so it only makes sense once the vote
        // has fully resolved.
        if record.vote_count(round_id) < record.players.len() {
            return Err(GameError::InvalidState(
                "voting has not finished".to_string(),
            ));
        }
        if !record.room.tiebreak_player_ids.is_empty() {
            return Err(GameError::InvalidState(
                "a tiebreak is still unresolved".to_string(),
            ));
        }
        if record.rounds[round_idx].impostor_guess.is_some() {
            return Err(GameError::Conflict(
                "a guess was already recorded".to_string(),
            ));
        }

        let word_id = record.rounds[round_idx].word_id.clone();
        let entry = self
            .catalog
            .lookup(&word_id)
            .await
            .ok_or_else(|| GameError::NotFound("word not found in catalog".to_string()))?;
        let correct = guess.to_lowercase() == entry.word.text.trim().to_lowercase();

        let round = &mut record.rounds[round_idx];
        round.impostor_guess = Some(guess);
        round.impostor_guessed_correct = Some(correct);

        if correct {
            if let Some(impostor) = record.players.iter_mut().find(|p| p.id == impostor_id) {
                impostor.score += 1;
            }
        } else {
            for civilian in record
                .players
                .iter_mut()
                .filter(|p| p.role == PlayerRole::Civilian)
            {
                civilian.score += 1;
            }
        }
        record.room.status = RoomStatus::Finished;

        tracing::info!(code = %code, correct, "impostor guess adjudicated");
        Ok(correct)
    }
}
