//! Structural validation of weekly pick submissions.
//!
//! Checks run in contract order: window, pick count, duplicate games, week
//! membership. Line stamping happens last so a rejected request never
//! touches line history. The atomic draft-overwrite/uniqueness half of
//! submission lives in the pick store.

use std::collections::HashSet;

use crate::error::{PickemError, Result};
use crate::models::{
    Game, GameId, Line, Pick, PickId, PickRequest, UserId, WeekId, WindowState,
};

/// Number of picks in a complete weekly submission.
pub const PICKS_PER_WEEK: usize = 3;

/// Validate a pick request against the current window and the week's
/// schedule, resolving each game. `require_full` distinguishes submissions
/// (exactly three picks) from draft saves (one to three).
pub fn check_request(
    window: &WindowState,
    week: WeekId,
    requests: &[PickRequest],
    resolve_game: impl Fn(&GameId) -> Option<Game>,
    require_full: bool,
) -> Result<Vec<(PickRequest, Game)>> {
    if !window.is_open || window.week != week {
        return Err(PickemError::LockedWindow { week });
    }

    let count_ok = if require_full {
        requests.len() == PICKS_PER_WEEK
    } else {
        (1..=PICKS_PER_WEEK).contains(&requests.len())
    };
    if !count_ok {
        return Err(PickemError::InvalidPickCount {
            expected: PICKS_PER_WEEK,
            got: requests.len(),
        });
    }

    let mut seen = HashSet::new();
    for request in requests {
        if !seen.insert(&request.game) {
            return Err(PickemError::DuplicateGame {
                game: request.game.clone(),
            });
        }
    }

    requests
        .iter()
        .map(|request| {
            let game = resolve_game(&request.game).ok_or_else(|| PickemError::UnknownGame {
                game: request.game.clone(),
            })?;
            if game.week != week {
                return Err(PickemError::WeekMismatch {
                    game: request.game.clone(),
                    game_week: game.week,
                    week,
                });
            }
            Ok((request.clone(), game))
        })
        .collect()
}

/// Stamp each checked request with the line currently in effect for its
/// game. This is the only place `spread_at_pick` is ever written.
pub fn build_picks(
    user: &UserId,
    week: WeekId,
    checked: &[(PickRequest, Game)],
    line_in_effect: impl Fn(&GameId) -> Option<Line>,
) -> Result<Vec<Pick>> {
    checked
        .iter()
        .map(|(request, _game)| {
            let line = line_in_effect(&request.game).ok_or_else(|| PickemError::MissingLine {
                game: request.game.clone(),
            })?;
            Ok(Pick {
                id: PickId {
                    user: user.clone(),
                    week,
                    game: request.game.clone(),
                },
                choice: request.choice,
                spread_at_pick: line.spread_home,
                line_source: line.source,
                grade: None,
            })
        })
        .collect()
}
