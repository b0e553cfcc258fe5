//! Spread grading.
//!
//! Spreads follow standard convention and are always stated from the home
//! team's perspective: a home team favored by 7 carries a spread of -7, a
//! 7-point home underdog carries +7. A pick is graded against the spread
//! frozen at submission time, never against later line movement, so every
//! grade is reproducible from history.

use crate::error::{PickemError, Result};
use crate::models::{Choice, Game, Outcome, Pick, PickGrade};

/// Point and payout values per outcome. Points drive the leaderboard;
/// payout units exist for the product's pot settlement and default to
/// standard -110 pricing (risk 1.1 units to win 1).
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringRules {
    pub win_points: f64,
    pub push_points: f64,
    pub loss_points: f64,
    pub win_payout: f64,
    pub push_payout: f64,
    pub loss_payout: f64,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            win_points: 1.0,
            push_points: 0.5,
            loss_points: 0.0,
            win_payout: 1.0,
            push_payout: 0.0,
            loss_payout: -1.1,
        }
    }
}

impl ScoringRules {
    pub fn points_for(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Win => self.win_points,
            Outcome::Push => self.push_points,
            Outcome::Loss => self.loss_points,
        }
    }

    pub fn payout_for(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Win => self.win_payout,
            Outcome::Push => self.push_payout,
            Outcome::Loss => self.loss_payout,
        }
    }
}

/// Home-perspective margin after applying the spread.
///
/// `(home - away) + spread`: positive means the home side covered, zero is
/// a push, negative means the away side covered.
pub fn adjusted_margin(home_score: u32, away_score: u32, spread_at_pick: f64) -> f64 {
    (home_score as f64 - away_score as f64) + spread_at_pick
}

/// Grade one choice against a final score and the spread frozen at pick
/// time. The margin sign is inverted for away picks before the same
/// win/push/loss test.
pub fn grade(
    choice: Choice,
    spread_at_pick: f64,
    home_score: u32,
    away_score: u32,
    rules: &ScoringRules,
) -> PickGrade {
    let mut margin = adjusted_margin(home_score, away_score, spread_at_pick);
    if choice == Choice::Away {
        margin = -margin;
    }

    let outcome = if margin > 0.0 {
        Outcome::Win
    } else if margin == 0.0 {
        Outcome::Push
    } else {
        Outcome::Loss
    };

    let verdict = match outcome {
        Outcome::Win => format!("covered by {:.1}", margin),
        Outcome::Push => "push".to_string(),
        Outcome::Loss => format!("missed by {:.1}", -margin),
    };

    PickGrade {
        outcome,
        result: format!(
            "{}-{}, home {:+.1}: {}",
            home_score, away_score, spread_at_pick, verdict
        ),
        points: rules.points_for(outcome),
        payout: rules.payout_for(outcome),
    }
}

/// Grade a pick against its game. Errors if the game has no final yet or
/// the pick already carries a grade; callers running sweeps count both
/// conditions instead of surfacing them.
pub fn grade_pick(pick: &Pick, game: &Game, rules: &ScoringRules) -> Result<PickGrade> {
    if pick.grade.is_some() {
        return Err(PickemError::AlreadyGraded {
            pick: pick.id.clone(),
        });
    }
    if !game.completed {
        return Err(PickemError::GameNotCompleted {
            game: game.id.clone(),
        });
    }
    let (home_score, away_score) = match (game.home_score, game.away_score) {
        (Some(h), Some(a)) => (h, a),
        // A completed flag without scores is a feed glitch; treat it as
        // not final so the sweep retries later.
        _ => {
            return Err(PickemError::GameNotCompleted {
                game: game.id.clone(),
            })
        }
    };
    Ok(grade(
        pick.choice,
        pick.spread_at_pick,
        home_score,
        away_score,
        rules,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameId, LineSource, PickId, UserId, WeekId};
    use chrono::{TimeZone, Utc};

    fn rules() -> ScoringRules {
        ScoringRules::default()
    }

    #[test]
    fn test_home_favorite_covers() {
        // Home favored by 3, wins 24-20: adjusted margin (24-20) + (-3) = 1.
        let grade = grade(Choice::Home, -3.0, 24, 20, &rules());
        assert_eq!(grade.outcome, Outcome::Win);
        assert_eq!(grade.points, 1.0);
        assert_eq!(grade.payout, 1.0);
        assert!(grade.result.contains("covered by 1.0"));
    }

    #[test]
    fn test_away_side_inverts_margin() {
        // Same game from the away side: -1 < 0, a loss.
        let grade = grade(Choice::Away, -3.0, 24, 20, &rules());
        assert_eq!(grade.outcome, Outcome::Loss);
        assert_eq!(grade.points, 0.0);
        assert_eq!(grade.payout, -1.1);
    }

    #[test]
    fn test_pick_em_tie_is_push() {
        let grade = grade(Choice::Home, 0.0, 20, 20, &rules());
        assert_eq!(grade.outcome, Outcome::Push);
        assert_eq!(grade.points, 0.5);
        assert_eq!(grade.payout, 0.0);
    }

    #[test]
    fn test_offsetting_spread_pushes_either_side() {
        // Margin exactly offsets the spread: push regardless of choice.
        let home = grade(Choice::Home, -4.0, 24, 20, &rules());
        let away = grade(Choice::Away, -4.0, 24, 20, &rules());
        assert_eq!(home.outcome, Outcome::Push);
        assert_eq!(away.outcome, Outcome::Push);
    }

    #[test]
    fn test_half_point_line_cannot_push() {
        let grade = grade(Choice::Home, -0.5, 21, 20, &rules());
        assert_eq!(grade.outcome, Outcome::Win);
        assert!((adjusted_margin(21, 20, -0.5) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_home_underdog_loses_outright_but_covers() {
        // Home getting 6.5 loses 17-20 but covers: (17-20) + 6.5 = 3.5.
        let grade = grade(Choice::Home, 6.5, 17, 20, &rules());
        assert_eq!(grade.outcome, Outcome::Win);
    }

    fn pick(graded: bool) -> Pick {
        Pick {
            id: PickId {
                user: UserId::from("ann"),
                week: WeekId::new(2025, 1),
                game: GameId::from("g1"),
            },
            choice: Choice::Home,
            spread_at_pick: -3.0,
            line_source: LineSource::Book("consensus".to_string()),
            grade: if graded {
                Some(grade(Choice::Home, -3.0, 24, 20, &ScoringRules::default()))
            } else {
                None
            },
        }
    }

    fn game(completed: bool) -> Game {
        Game {
            id: GameId::from("g1"),
            week: WeekId::new(2025, 1),
            home_team: "Iowa".to_string(),
            away_team: "Nebraska".to_string(),
            kickoff: Utc.with_ymd_and_hms(2025, 8, 30, 16, 0, 0).unwrap(),
            home_score: completed.then_some(24),
            away_score: completed.then_some(20),
            completed,
        }
    }

    #[test]
    fn test_grade_pick_requires_final() {
        let err = grade_pick(&pick(false), &game(false), &rules()).unwrap_err();
        assert!(matches!(err, PickemError::GameNotCompleted { .. }));
    }

    #[test]
    fn test_grade_pick_refuses_regrade() {
        let err = grade_pick(&pick(true), &game(true), &rules()).unwrap_err();
        assert!(matches!(err, PickemError::AlreadyGraded { .. }));
    }

    #[test]
    fn test_grade_pick_happy_path() {
        let grade = grade_pick(&pick(false), &game(true), &rules()).unwrap();
        assert_eq!(grade.outcome, Outcome::Win);
    }
}
