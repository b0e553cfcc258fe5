//! Penalty backfill for users who let a week lapse without submitting.
//!
//! The synthetic set must be indistinguishable from an ordinary graded set
//! downstream: three picks, locked status, every pick carrying a grade. It
//! rides the week's three earliest kickoffs, picking the side that lost
//! outright on a zero spread so the set grades 0-3 without touching real
//! line history.

use chrono::{DateTime, Utc};

use crate::engine::grading::ScoringRules;
use crate::engine::validator::PICKS_PER_WEEK;
use crate::error::{PickemError, Result};
use crate::models::{
    Choice, Game, LineSource, Outcome, Pick, PickGrade, PickId, PickSet, PickStatus, UserId,
    WeekId,
};

/// Build the penalty set for one user and week. `week_games` is that
/// week's full slate; every game must be final before the rule runs.
/// `locked_at` stamps the set with the week's lock instant rather than the
/// backfill run time, keeping records comparable across weeks.
pub fn synthesize_missed_week(
    user: &UserId,
    week: WeekId,
    week_games: &[Game],
    locked_at: DateTime<Utc>,
    rules: &ScoringRules,
) -> Result<PickSet> {
    if let Some(pending) = week_games.iter().find(|g| !g.completed) {
        return Err(PickemError::GameNotCompleted {
            game: pending.id.clone(),
        });
    }
    if week_games.len() < PICKS_PER_WEEK {
        return Err(PickemError::NotEnoughGames {
            week,
            have: week_games.len(),
            need: PICKS_PER_WEEK,
        });
    }

    let mut games: Vec<&Game> = week_games.iter().collect();
    games.sort_by(|a, b| a.kickoff.cmp(&b.kickoff).then_with(|| a.id.cmp(&b.id)));

    let picks = games
        .iter()
        .take(PICKS_PER_WEEK)
        .map(|game| {
            // A tied final has no outright loser; the forced grade below
            // makes the side immaterial, so take home.
            let choice = game.losing_side().unwrap_or(Choice::Home);
            Pick {
                id: PickId {
                    user: user.clone(),
                    week,
                    game: game.id.clone(),
                },
                choice,
                spread_at_pick: 0.0,
                line_source: LineSource::Penalty,
                grade: Some(PickGrade {
                    outcome: Outcome::Loss,
                    result: "missed week, no submission".to_string(),
                    points: rules.loss_points,
                    payout: 0.0,
                }),
            }
        })
        .collect();

    Ok(PickSet {
        user: user.clone(),
        week,
        status: PickStatus::Locked,
        submitted_at: locked_at,
        picks,
    })
}
