use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque user identifier supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque game identifier minted by the result feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameId(pub String);

impl GameId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GameId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque squad identifier from the squad/membership store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SquadId(pub String);

impl SquadId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SquadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for SquadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One competition week: season year plus week number, ordered by both.
/// Immutable once minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeekId {
    pub season: i32,
    pub number: u8,
}

impl WeekId {
    pub fn new(season: i32, number: u8) -> Self {
        Self { season, number }
    }
}

impl fmt::Display for WeekId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.season, self.number)
    }
}

impl FromStr for WeekId {
    type Err = String;

    /// Accepts `2025-W03`, `2025-w3`, or `2025w3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let (season, number) = lower
            .split_once("-w")
            .or_else(|| lower.split_once('w'))
            .ok_or_else(|| format!("invalid week id '{}', expected e.g. 2025-W03", s))?;
        let season: i32 = season
            .parse()
            .map_err(|_| format!("invalid season year in '{}'", s))?;
        let number: u8 = number
            .parse()
            .map_err(|_| format!("invalid week number in '{}'", s))?;
        Ok(WeekId { season, number })
    }
}

/// The side of a game a pick rides on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    Home,
    Away,
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::Home => write!(f, "home"),
            Choice::Away => write!(f, "away"),
        }
    }
}

impl FromStr for Choice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "home" | "h" => Ok(Choice::Home),
            "away" | "a" => Ok(Choice::Away),
            other => Err(format!("invalid choice '{}', expected home or away", other)),
        }
    }
}

/// One scheduled game. Created by the result feed; only the feed path ever
/// writes the score and completed fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub week: WeekId,
    pub home_team: String,
    pub away_team: String,
    pub kickoff: DateTime<Utc>,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub completed: bool,
}

impl Game {
    /// Final home-minus-away margin, once both scores are known.
    pub fn final_margin(&self) -> Option<i64> {
        Some(self.home_score? as i64 - self.away_score? as i64)
    }

    /// The side that lost on the final score. `None` on a tied final.
    pub fn losing_side(&self) -> Option<Choice> {
        match self.final_margin()? {
            m if m > 0 => Some(Choice::Away),
            m if m < 0 => Some(Choice::Home),
            _ => None,
        }
    }

    pub fn matchup(&self) -> String {
        format!("{} @ {}", self.away_team, self.home_team)
    }
}

/// Where a spread value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineSource {
    /// A sportsbook or consensus feed, tagged by name.
    Book(String),
    /// Synthetic zero line attached to penalty backfill picks.
    Penalty,
}

impl fmt::Display for LineSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineSource::Book(name) => write!(f, "{}", name),
            LineSource::Penalty => write!(f, "penalty"),
        }
    }
}

/// A spread quote for a game, home-team perspective (negative means the
/// home team is favored). Quotes accumulate as odds move; grading always
/// uses the one in effect at pick time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    pub game: GameId,
    pub spread_home: f64,
    pub source: LineSource,
    pub posted_at: DateTime<Utc>,
}

/// Lifecycle of a weekly pick set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickStatus {
    Draft,
    Submitted,
    Locked,
}

impl fmt::Display for PickStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PickStatus::Draft => write!(f, "draft"),
            PickStatus::Submitted => write!(f, "submitted"),
            PickStatus::Locked => write!(f, "locked"),
        }
    }
}

/// Grading verdict for a single pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Push,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "win"),
            Outcome::Loss => write!(f, "loss"),
            Outcome::Push => write!(f, "push"),
        }
    }
}

/// Addresses one pick: the (user, week) set plus the game it rides on.
/// A game appears at most once per set, so the triple is unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PickId {
    pub user: UserId,
    pub week: WeekId,
    pub game: GameId,
}

impl fmt::Display for PickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.user, self.week, self.game)
    }
}

/// Grading output. Written to a pick exactly once; the engine never
/// recomputes an existing grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickGrade {
    pub outcome: Outcome,
    pub result: String,
    pub points: f64,
    pub payout: f64,
}

/// One pick inside a weekly set. `spread_at_pick` is stamped at submission
/// and never overwritten, so grading stays reproducible from history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pick {
    pub id: PickId,
    pub choice: Choice,
    pub spread_at_pick: f64,
    pub line_source: LineSource,
    pub grade: Option<PickGrade>,
}

impl Pick {
    pub fn is_graded(&self) -> bool {
        self.grade.is_some()
    }
}

/// One user's bundle of picks for one week. Submitted and locked sets hold
/// exactly three picks over three distinct games; drafts may hold fewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickSet {
    pub user: UserId,
    pub week: WeekId,
    pub status: PickStatus,
    pub submitted_at: DateTime<Utc>,
    pub picks: Vec<Pick>,
}

impl PickSet {
    pub fn pick_for_game(&self, game: &GameId) -> Option<&Pick> {
        self.picks.iter().find(|p| &p.id.game == game)
    }
}

/// One requested pick in a submission: the game and the side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickRequest {
    pub game: GameId,
    pub choice: Choice,
}

/// Derived standings row; recomputed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user: UserId,
    pub wins: u32,
    pub losses: u32,
    pub pushes: u32,
    pub points: f64,
    pub win_pct: f64,
    pub rank: usize,
}

/// Where the clock falls for one week: open for submissions, locked, or
/// (before the season opener) neither.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowState {
    pub week: WeekId,
    pub is_open: bool,
    pub is_locked: bool,
    pub opens_at: DateTime<Utc>,
    pub locks_at: DateTime<Utc>,
}

/// Counters from one grading sweep. Pending and already-graded picks are
/// counted, never surfaced as failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub graded: usize,
    pub pending: usize,
    pub already_graded: usize,
}

/// Time span of a leaderboard query. `Season` spans every week up to and
/// including the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Week(WeekId),
    Season,
}

/// Who a leaderboard covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    Global,
    Squad(SquadId),
}

/// How squad membership is evaluated when aggregating. Kept explicit
/// because the product has not settled on one reading (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MembershipBasis {
    /// Members at query time; their whole history counts.
    #[default]
    Current,
    /// A pick counts only if the user was a member when it was submitted.
    AtSubmission,
}

/// A user known to the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub registered_at: DateTime<Utc>,
}

/// One span of squad membership. An open span has no `left_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipSpan {
    pub user: UserId,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

impl MembershipSpan {
    /// Whether the span covers instant `at`.
    pub fn active_at(&self, at: DateTime<Utc>) -> bool {
        self.joined_at <= at && self.left_at.map_or(true, |left| at < left)
    }

    /// Whether the span intersects the half-open interval `[start, end)`.
    pub fn intersects(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.joined_at < end && self.left_at.map_or(true, |left| start < left)
    }
}

/// A squad and its membership history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquadRecord {
    pub id: SquadId,
    pub name: String,
    pub members: Vec<MembershipSpan>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_week_id_ordering() {
        let w3 = WeekId::new(2025, 3);
        let w4 = WeekId::new(2025, 4);
        let next_season = WeekId::new(2026, 1);
        assert!(w3 < w4);
        assert!(w4 < next_season);
    }

    #[test]
    fn test_week_id_parse_and_display() {
        let week: WeekId = "2025-W03".parse().unwrap();
        assert_eq!(week, WeekId::new(2025, 3));
        assert_eq!(week.to_string(), "2025-W03");
        assert_eq!("2025w11".parse::<WeekId>().unwrap(), WeekId::new(2025, 11));
        assert!("week three".parse::<WeekId>().is_err());
    }

    #[test]
    fn test_losing_side() {
        let mut game = Game {
            id: GameId::from("g1"),
            week: WeekId::new(2025, 1),
            home_team: "Iowa".to_string(),
            away_team: "Nebraska".to_string(),
            kickoff: Utc.with_ymd_and_hms(2025, 8, 30, 16, 0, 0).unwrap(),
            home_score: Some(24),
            away_score: Some(20),
            completed: true,
        };
        assert_eq!(game.final_margin(), Some(4));
        assert_eq!(game.losing_side(), Some(Choice::Away));

        game.home_score = Some(17);
        assert_eq!(game.losing_side(), Some(Choice::Home));

        game.home_score = Some(20);
        assert_eq!(game.losing_side(), None);

        game.home_score = None;
        assert_eq!(game.final_margin(), None);
    }

    #[test]
    fn test_membership_span_windows() {
        let join = Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap();
        let leave = Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap();
        let span = MembershipSpan {
            user: UserId::from("ann"),
            joined_at: join,
            left_at: Some(leave),
        };
        assert!(span.active_at(join));
        assert!(!span.active_at(leave));
        assert!(span.intersects(
            Utc.with_ymd_and_hms(2025, 9, 15, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 9, 16, 0, 0, 0).unwrap(),
        ));
        assert!(!span.intersects(
            Utc.with_ymd_and_hms(2025, 10, 2, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 10, 9, 0, 0, 0).unwrap(),
        ));
    }
}
