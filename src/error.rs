//! Error taxonomy shared by every engine operation.
//!
//! All expected failure conditions are returned as one of these variants
//! rather than propagating as faults. Messages are short and suitable for
//! direct display to the caller.

pub type GameResult<T> = Result<T, GameError>;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum GameError {
    /// No caller identity was supplied
    #[error("you must be signed in")]
    Unauthenticated,

    /// Caller is identified but lacks permission for the operation
    #[error("{0}")]
    Unauthorized(String),

    /// Room, round or player is absent or mismatched
    #[error("{0}")]
    NotFound(String),

    /// Operation attempted in the wrong phase
    #[error("{0}")]
    InvalidState(String),

    /// Duplicate write or exhausted resource
    #[error("{0}")]
    Conflict(String),

    /// Malformed input
    #[error("{0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_displayable() {
        let err = GameError::Conflict("you have already voted".to_string());
        assert_eq!(err.to_string(), "you have already voted");
        assert_eq!(GameError::Unauthenticated.to_string(), "you must be signed in");
    }
}
