//! Pure calculators behind the pick lifecycle: week windows, submission
//! validation, spread grading, standings, and penalty backfill. Nothing in
//! here touches a store or a clock; the service layer wires those in.

pub mod grading;
pub mod leaderboard;
pub mod penalty;
pub mod validator;
pub mod week_window;

pub use grading::{adjusted_margin, grade, grade_pick, ScoringRules};
pub use leaderboard::{rank, tally_users, Tally};
pub use penalty::synthesize_missed_week;
pub use validator::{build_picks, check_request, PICKS_PER_WEEK};
pub use week_window::SeasonSchedule;
