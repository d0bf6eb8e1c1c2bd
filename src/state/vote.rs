use std::collections::HashMap;

use serde::Serialize;

use super::room::normalize_code;
use super::{require_caller, AppState};
use crate::error::{GameError, GameResult};
use crate::types::*;

/// Result of evaluating the current round's votes for a tie.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TiebreakOutcome {
    pub tiebreak: bool,
    pub tied_player_ids: Vec<PlayerId>,
}

/// Per-target vote counts.
pub(crate) fn tally_votes<'a>(votes: impl Iterator<Item = &'a Vote>) -> HashMap<PlayerId, u32> {
    let mut counts: HashMap<PlayerId, u32> = HashMap::new();
    for vote in votes {
        *counts.entry(vote.target_id.clone()).or_insert(0) += 1;
    }
    counts
}

/// Players sharing the maximal vote count. Empty unless at least two tie
/// for the lead; sorted so callers get a stable order.
pub(crate) fn tied_leaders(counts: &HashMap<PlayerId, u32>) -> Vec<PlayerId> {
    let Some(max) = counts.values().max().copied() else {
        return Vec::new();
    };
    let mut leaders: Vec<PlayerId> = counts
        .iter()
        .filter(|(_, count)| **count == max)
        .map(|(id, _)| id.clone())
        .collect();
    if leaders.len() < 2 {
        return Vec::new();
    }
    leaders.sort();
    leaders
}

impl AppState {
    /// Cast the caller's vote against a player in the given round. One
    /// vote per caster per round; during a tiebreak revote the target
    /// must be one of the tied players.
    pub async fn cast_vote(
        &self,
        caller: &str,
        code: &str,
        round_id: &str,
        target_player_id: &str,
    ) -> GameResult<()> {
        require_caller(caller)?;
        let code = normalize_code(code)?;

        let handle = self.room_handle(&code).await?;
        let mut record = handle.lock().await;
        record.ensure_live()?;

        let round_id = record
            .round_by_id(round_id)
            .ok_or_else(|| GameError::NotFound("round not found".to_string()))?
            .id
            .clone();
        let caster_id = record
            .player_for_user(caller)
            .ok_or_else(|| GameError::NotFound("you are not in this room".to_string()))?
            .id
            .clone();
        if !record.contains_player(target_player_id) {
            return Err(GameError::Validation(
                "that player is not in this room".to_string(),
            ));
        }

        let tied = &record.room.tiebreak_player_ids;
        if !tied.is_empty() {
            let defense_done =
                record.room.tiebreak_defense_idx.unwrap_or(0) as usize >= tied.len();
            if defense_done && !tied.iter().any(|id| id == target_player_id) {
                return Err(GameError::Validation(
                    "the revote must target one of the tied players".to_string(),
                ));
            }
        }

        if record
            .votes_for_round(&round_id)
            .any(|v| v.caster_id == caster_id)
        {
            return Err(GameError::Conflict("you have already voted".to_string()));
        }

        record.votes.push(Vote {
            id: ulid::Ulid::new().to_string(),
            round_id,
            caster_id,
            target_id: target_player_id.to_string(),
            ts: chrono::Utc::now().to_rfc3339(),
        });
        Ok(())
    }

    /// Evaluate the round's votes once everyone has voted. A fresh tie
    /// activates the tiebreak; a tie while one is active restarts it
    /// (votes purged, defense rotation reset - successive tie rounds are
    /// unbounded); a broken tie clears the tiebreak fields.
    pub async fn check_for_tiebreak(&self, caller: &str, code: &str) -> GameResult<TiebreakOutcome> {
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
        let round_id = record
            .latest_round()
            .ok_or_else(|| GameError::NotFound("no active round".to_string()))?
            .id
            .clone();
        if record.vote_count(&round_id) < record.players.len() {
            return Err(GameError::InvalidState(
                "not everyone has voted yet".to_string(),
            ));
        }

        let counts = tally_votes(record.votes_for_round(&round_id));
        let tied = tied_leaders(&counts);
        let already_active = !record.room.tiebreak_player_ids.is_empty();

        if tied.len() > 1 {
            if already_active {
                // The revote tied again: wipe it and rotate defenses anew
                record.purge_votes(&round_id);
                tracing::info!(code = %code, tied = tied.len(), "revote tied again, restarting tiebreak");
            } else {
                tracing::info!(code = %code, tied = tied.len(), "vote tied, starting tiebreak");
            }
            record.room.tiebreak_player_ids = tied.clone();
            record.room.tiebreak_defense_idx = Some(0);
            record.room.tiebreak_started_at = Some(chrono::Utc::now().to_rfc3339());
            return Ok(TiebreakOutcome {
                tiebreak: true,
                tied_player_ids: tied,
            });
        }

        if already_active {
            record.room.tiebreak_player_ids.clear();
            record.room.tiebreak_defense_idx = None;
            record.room.tiebreak_started_at = None;
            tracing::info!(code = %code, "revote resolved, tiebreak cleared");
        }
        Ok(TiebreakOutcome {
            tiebreak: false,
            tied_player_ids: Vec::new(),
        })
    }

    /// Move the defense rotation along. When the last tied player has
    /// defended, the round's votes are purged for a clean revote and the
    /// index stays at the terminal sentinel.
    pub async fn next_tiebreak_defense(&self, caller: &str, code: &str) -> GameResult<()> {
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
        let tied_len = record.room.tiebreak_player_ids.len() as u32;
        if tied_len == 0 {
            return Err(GameError::InvalidState(
                "no tiebreak in progress".to_string(),
            ));
        }

        let next = record.room.tiebreak_defense_idx.unwrap_or(0) + 1;
        if next >= tied_len {
            if let Some(round) = record.latest_round() {
                let round_id = round.id.clone();
                record.purge_votes(&round_id);
            }
            record.room.tiebreak_defense_idx = Some(tied_len);
            record.room.tiebreak_started_at = None;
        } else {
            record.room.tiebreak_defense_idx = Some(next);
            record.room.tiebreak_started_at = Some(chrono::Utc::now().to_rfc3339());
        }
        Ok(())
    }

    /// Reset all tiebreak state unconditionally.
    pub async fn clear_tiebreak(&self, caller: &str, code: &str) -> GameResult<()> {
        require_caller(caller)?;
        let code = normalize_code(code)?;

        let handle = self.room_handle(&code).await?;
        let mut record = handle.lock().await;
        record.ensure_live()?;

        record.room.tiebreak_player_ids.clear();
        record.room.tiebreak_defense_idx = None;
        record.room.tiebreak_started_at = None;
        Ok(())
    }
}
