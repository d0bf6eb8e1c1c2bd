//! Explicit derivation of the fine-grained room phase.
//!
//! Only `RoomStatus` is stored. The sub-phases of a running game fall
//! out of the turn index, the vote count and the tiebreak fields, and
//! every consumer must agree on that mapping, so it lives here as one
//! pure function.

use crate::types::{RoomPhase, RoomStatus};

pub fn derive_phase(
    status: RoomStatus,
    current_turn_index: Option<u32>,
    player_count: usize,
    vote_count: usize,
    tiebreak_len: usize,
    tiebreak_defense_idx: Option<u32>,
) -> RoomPhase {
    match status {
        RoomStatus::Waiting => RoomPhase::Waiting,
        RoomStatus::Finished => RoomPhase::Finished,
        RoomStatus::Playing => {
            if tiebreak_len > 0 {
                // A populated tied set means the tiebreak sub-protocol
                // owns the room until it resolves.
                let idx = tiebreak_defense_idx.unwrap_or(0) as usize;
                if idx < tiebreak_len {
                    RoomPhase::TiebreakDefense
                } else {
                    RoomPhase::TiebreakRevote
                }
            } else if (current_turn_index.unwrap_or(0) as usize) < player_count {
                RoomPhase::Turns
            } else if vote_count < player_count {
                RoomPhase::Voting
            } else {
                RoomPhase::Guess
            }
        }
    }
}
