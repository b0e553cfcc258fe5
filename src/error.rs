//! Error kinds for the pick lifecycle and scoring core.
//!
//! Validator errors are returned synchronously for user-facing messaging.
//! `GameNotCompleted` and `AlreadyGraded` are retry/no-op conditions: the
//! grading sweep swallows and counts them instead of escalating. Nothing
//! here is fatal to the calling process.

use crate::models::{GameId, PickId, SquadId, UserId, WeekId};
use thiserror::Error;

/// Result type for pick lifecycle operations.
pub type Result<T> = std::result::Result<T, PickemError>;

#[derive(Debug, Clone, Error)]
pub enum PickemError {
    #[error("submission window for {week} is not open")]
    LockedWindow { week: WeekId },

    #[error("expected exactly {expected} picks, got {got}")]
    InvalidPickCount { expected: usize, got: usize },

    #[error("game {game} picked more than once")]
    DuplicateGame { game: GameId },

    #[error("game {game} belongs to {game_week}, not {week}")]
    WeekMismatch {
        game: GameId,
        game_week: WeekId,
        week: WeekId,
    },

    #[error("{user} already submitted picks for {week}")]
    AlreadySubmitted { user: UserId, week: WeekId },

    #[error("game {game} has not completed")]
    GameNotCompleted { game: GameId },

    #[error("pick {pick} is already graded")]
    AlreadyGraded { pick: PickId },

    #[error("unknown game {game}")]
    UnknownGame { game: GameId },

    #[error("no line in effect for game {game}")]
    MissingLine { game: GameId },

    #[error("no pick set for {user} in {week}")]
    PickSetNotFound { user: UserId, week: WeekId },

    #[error("no pick {pick}")]
    PickNotFound { pick: PickId },

    #[error("{week} has only {have} completed games, need {need}")]
    NotEnoughGames { week: WeekId, have: usize, need: usize },

    #[error("unknown squad {squad}")]
    UnknownSquad { squad: SquadId },

    #[error("invalid configuration: {0}")]
    Config(String),
}
