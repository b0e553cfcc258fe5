//! The service facade: every inbound operation of the platform goes
//! through here. Engines do the math, stores hold the state, the clock and
//! notifier are injected so tests can steer time and observe events.
//!
//! Week addresses resolve against the configured season schedule; a week
//! from another season is rejected rather than silently mapped.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::engine::grading::{self, ScoringRules};
use crate::engine::week_window::SeasonSchedule;
use crate::engine::{leaderboard, penalty, validator};
use crate::error::{PickemError, Result};
use crate::models::{
    Audience, Game, GameId, LeaderboardEntry, Line, MembershipBasis, Period, PickGrade, PickId,
    PickRequest, PickSet, PickStatus, SquadId, SquadRecord, SweepReport, UserId, UserRecord,
    WeekId, WindowState,
};
use crate::notify::{Notifier, NullNotifier, PickemEvent};
use crate::store::{GameStore, GradeWrite, MembershipStore, PickStore};

pub struct PickemService {
    schedule: SeasonSchedule,
    scoring: ScoringRules,
    games: GameStore,
    picks: PickStore,
    membership: MembershipStore,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    last_poll: RwLock<Option<DateTime<Utc>>>,
}

impl PickemService {
    pub fn new(
        schedule: SeasonSchedule,
        scoring: ScoringRules,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            schedule,
            scoring,
            games: GameStore::new(),
            picks: PickStore::new(),
            membership: MembershipStore::new(),
            clock,
            notifier,
            last_poll: RwLock::new(None),
        }
    }

    /// Production wiring: system clock, no notifier fanout.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            config.schedule()?,
            ScoringRules::default(),
            Arc::new(SystemClock),
            Arc::new(NullNotifier),
        ))
    }

    pub fn schedule(&self) -> &SeasonSchedule {
        &self.schedule
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Resolve a week address against the configured season.
    fn season_week(&self, week: WeekId) -> Result<u8> {
        if week.season != self.schedule.season()
            || week.number < 1
            || week.number > self.schedule.max_weeks()
        {
            return Err(PickemError::Config(format!(
                "week {} is outside the configured {} season",
                week,
                self.schedule.season()
            )));
        }
        Ok(week.number)
    }

    /// Flip submitted sets to locked wherever the lock anchor has passed.
    /// Called lazily ahead of reads and grading so nothing depends on a
    /// background task being alive.
    fn lock_due_sets(&self) -> usize {
        let now = self.now();
        self.picks
            .apply_due_locks(|week| self.schedule.is_locked_for(week, now))
    }

    // -- window ----------------------------------------------------------

    pub fn window_state(&self) -> WindowState {
        self.schedule.window_state(self.now())
    }

    pub fn window_state_at(&self, now: DateTime<Utc>) -> WindowState {
        self.schedule.window_state(now)
    }

    pub fn current_week(&self) -> WeekId {
        self.schedule.current_week(self.now())
    }

    /// Detect anchor crossings since the previous poll, apply due locks,
    /// and emit events. The first poll only baselines the clock.
    pub fn poll_transitions(&self) -> Vec<PickemEvent> {
        let now = self.now();
        let previous = {
            let mut last = self.last_poll.write().unwrap();
            last.replace(now)
        };

        let mut events = Vec::new();
        if let Some(previous) = previous {
            for number in 1..=self.schedule.max_weeks() {
                let week = self.schedule.week(number);
                let opens = self.schedule.open_anchor(number);
                if previous < opens && opens <= now {
                    events.push(PickemEvent::WeekOpened(week));
                }
                let locks = self.schedule.lock_anchor(number);
                if previous < locks && locks <= now {
                    events.push(PickemEvent::WeekLocked(week));
                }
            }
        }

        let flipped = self.lock_due_sets();
        if flipped > 0 {
            info!("locked {} submitted pick sets", flipped);
        }
        for event in &events {
            self.notifier.notify(event);
        }
        events
    }

    // -- submission ------------------------------------------------------

    /// Submit a full week of picks. Replaces a saved draft whole and
    /// restamps every spread from the line in effect right now.
    pub fn submit_picks(
        &self,
        user: &UserId,
        week: WeekId,
        requests: &[PickRequest],
    ) -> Result<PickSet> {
        let now = self.now();
        let window = self.schedule.window_state(now);
        let checked =
            validator::check_request(&window, week, requests, |id| self.games.game(id), true)?;
        let picks = validator::build_picks(user, week, &checked, |id| {
            self.games.line_in_effect(id, now)
        })?;
        let set = PickSet {
            user: user.clone(),
            week,
            status: PickStatus::Submitted,
            submitted_at: now,
            picks,
        };
        self.picks.commit_submission(set.clone())?;
        info!("{} submitted {} picks for {}", user, set.picks.len(), week);
        Ok(set)
    }

    /// Save a partial or full draft. Drafts carry provisional spreads and
    /// are re-stamped at submission.
    pub fn save_draft(
        &self,
        user: &UserId,
        week: WeekId,
        requests: &[PickRequest],
    ) -> Result<PickSet> {
        let now = self.now();
        let window = self.schedule.window_state(now);
        let checked =
            validator::check_request(&window, week, requests, |id| self.games.game(id), false)?;
        let picks = validator::build_picks(user, week, &checked, |id| {
            self.games.line_in_effect(id, now)
        })?;
        let set = PickSet {
            user: user.clone(),
            week,
            status: PickStatus::Draft,
            submitted_at: now,
            picks,
        };
        self.picks.save_draft(set.clone())?;
        Ok(set)
    }

    // -- grading ---------------------------------------------------------

    /// Grade one pick. Already-graded picks return their existing grade
    /// unchanged; a race with a concurrent sweep resolves to whichever
    /// grade landed first.
    pub fn grade_pick(&self, pick_id: &PickId) -> Result<PickGrade> {
        self.lock_due_sets();
        let set = self.picks.require_set(&pick_id.user, pick_id.week)?;
        let pick = set
            .pick_for_game(&pick_id.game)
            .ok_or_else(|| PickemError::PickNotFound {
                pick: pick_id.clone(),
            })?;
        if let Some(existing) = &pick.grade {
            return Ok(existing.clone());
        }
        let game = self.games.require_game(&pick_id.game)?;
        let grade = grading::grade_pick(pick, &game, &self.scoring)?;
        match self.picks.apply_grade(pick_id, grade.clone())? {
            GradeWrite::Applied => {
                self.notifier.notify(&PickemEvent::GradePosted {
                    pick: pick_id.clone(),
                    outcome: grade.outcome,
                });
                Ok(grade)
            }
            GradeWrite::AlreadyGraded => {
                let set = self.picks.require_set(&pick_id.user, pick_id.week)?;
                Ok(set
                    .pick_for_game(&pick_id.game)
                    .and_then(|p| p.grade.clone())
                    .unwrap_or(grade))
            }
        }
    }

    /// Grade everything gradeable in one week, or in the whole season up
    /// to the current week. Pending games and already-graded picks are
    /// counted, never errors.
    pub fn grade_sweep(&self, week: Option<WeekId>) -> SweepReport {
        self.lock_due_sets();
        let sets = match week {
            Some(week) => self.picks.sets_for_week(week),
            None => {
                let current = self.current_week();
                self.picks.sets_through_week(current.season, current.number)
            }
        };

        let mut report = SweepReport::default();
        for set in sets {
            if set.status == PickStatus::Draft {
                continue;
            }
            for pick in &set.picks {
                if pick.is_graded() {
                    report.already_graded += 1;
                    continue;
                }
                let game = match self.games.game(&pick.id.game) {
                    Some(game) => game,
                    None => {
                        report.pending += 1;
                        continue;
                    }
                };
                match grading::grade_pick(pick, &game, &self.scoring) {
                    Ok(grade) => match self.picks.apply_grade(&pick.id, grade.clone()) {
                        Ok(GradeWrite::Applied) => {
                            report.graded += 1;
                            self.notifier.notify(&PickemEvent::GradePosted {
                                pick: pick.id.clone(),
                                outcome: grade.outcome,
                            });
                        }
                        Ok(GradeWrite::AlreadyGraded) => report.already_graded += 1,
                        Err(_) => report.pending += 1,
                    },
                    Err(PickemError::GameNotCompleted { .. }) => report.pending += 1,
                    Err(PickemError::AlreadyGraded { .. }) => report.already_graded += 1,
                    Err(_) => report.pending += 1,
                }
            }
        }
        info!(
            "grading sweep: {} graded, {} pending, {} already graded",
            report.graded, report.pending, report.already_graded
        );
        report
    }

    // -- leaderboard -----------------------------------------------------

    pub fn leaderboard(
        &self,
        period: Period,
        audience: Audience,
        basis: MembershipBasis,
    ) -> Result<Vec<LeaderboardEntry>> {
        self.lock_due_sets();
        if let Period::Week(week) = period {
            self.season_week(week)?;
        }
        let sets: Vec<PickSet> = match period {
            Period::Week(week) => self.picks.sets_for_week(week),
            Period::Season => {
                let current = self.current_week();
                self.picks.sets_through_week(current.season, current.number)
            }
        }
        .into_iter()
        .filter(|s| s.status != PickStatus::Draft)
        .collect();

        let entries = match audience {
            Audience::Global => {
                let mut universe = self.membership.user_ids();
                for set in &sets {
                    if !universe.contains(&set.user) {
                        universe.push(set.user.clone());
                    }
                }
                let picks = sets.iter().flat_map(|s| s.picks.iter());
                leaderboard::rank(leaderboard::tally_users(universe.iter(), picks))
            }
            Audience::Squad(squad) => match basis {
                MembershipBasis::Current => {
                    let members = self.membership.current_members(&squad)?;
                    let picks = sets.iter().flat_map(|s| s.picks.iter());
                    leaderboard::rank(leaderboard::tally_users(members.iter(), picks))
                }
                MembershipBasis::AtSubmission => {
                    let (start, end) = self.period_range(period)?;
                    let universe = self.membership.members_during(&squad, start, end)?;
                    let counted: Vec<&PickSet> = sets
                        .iter()
                        .filter(|set| {
                            self.membership
                                .member_at(&squad, &set.user, set.submitted_at)
                                .unwrap_or(false)
                        })
                        .collect();
                    let picks = counted.iter().flat_map(|s| s.picks.iter());
                    leaderboard::rank(leaderboard::tally_users(universe.iter(), picks))
                }
            },
        };
        Ok(entries)
    }

    /// The instant range a period covers, for membership intersection. A
    /// week's extent runs to the next open anchor, not just to its lock;
    /// joining during the dead time between lock and next open still
    /// belongs to that week.
    fn period_range(&self, period: Period) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        match period {
            Period::Week(week) => {
                let number = self.season_week(week)?;
                Ok((
                    self.schedule.open_anchor(number),
                    self.schedule.open_anchor(number.saturating_add(1)),
                ))
            }
            Period::Season => {
                let current = self.current_week();
                Ok((
                    self.schedule.open_anchor(1),
                    self.schedule.open_anchor(current.number.saturating_add(1)),
                ))
            }
        }
    }

    // -- penalty backfill ------------------------------------------------

    /// Write the synthetic 0-for-3 set for one user who missed a week.
    pub fn backfill_missing_week(&self, user: &UserId, week: WeekId) -> Result<PickSet> {
        let number = self.season_week(week)?;
        let games = self.games.games_for_week(week);
        let locked_at = self.schedule.lock_anchor(number);
        let set = penalty::synthesize_missed_week(user, week, &games, locked_at, &self.scoring)?;
        self.picks.insert_backfill(set.clone())?;
        info!("penalty backfill written for {} in {}", user, week);
        Ok(set)
    }

    /// Backfill every registered user who missed the week. Eligibility is
    /// registration before the week's lock anchor; users holding any set,
    /// draft included, are skipped. Returns how many sets were written.
    pub fn backfill_week(&self, week: WeekId) -> Result<usize> {
        let number = self.season_week(week)?;
        let locked_at = self.schedule.lock_anchor(number);
        let games = self.games.games_for_week(week);
        let skip = self.picks.users_with_sets(week);

        let mut written = 0;
        for user in self.membership.registered_before(locked_at) {
            if skip.contains(&user) {
                continue;
            }
            let set = penalty::synthesize_missed_week(&user, week, &games, locked_at, &self.scoring)?;
            self.picks.insert_backfill(set)?;
            written += 1;
        }
        info!("penalty backfill for {}: {} sets written", week, written);
        Ok(written)
    }

    // -- read surface and feed plumbing ----------------------------------

    pub fn game(&self, id: &GameId) -> Option<Game> {
        self.games.game(id)
    }

    pub fn games_for_week(&self, week: WeekId) -> Vec<Game> {
        self.games.games_for_week(week)
    }

    pub fn all_games(&self) -> Vec<Game> {
        self.games.all_games()
    }

    pub fn all_lines(&self) -> Vec<Line> {
        self.games.all_lines()
    }

    pub fn line_in_effect(&self, game: &GameId, at: DateTime<Utc>) -> Option<Line> {
        self.games.line_in_effect(game, at)
    }

    pub fn pick_set(&self, user: &UserId, week: WeekId) -> Option<PickSet> {
        self.lock_due_sets();
        self.picks.set_for(user, week)
    }

    pub fn pick_sets_for_week(&self, week: WeekId) -> Vec<PickSet> {
        self.lock_due_sets();
        self.picks.sets_for_week(week)
    }

    pub fn all_pick_sets(&self) -> Vec<PickSet> {
        self.picks.all_sets()
    }

    /// Feed path: insert or update a game record.
    pub fn upsert_game(&self, game: Game) {
        self.games.upsert_game(game);
    }

    /// Feed path: append a line quote.
    pub fn post_line(&self, line: Line) -> Result<()> {
        self.games.post_line(line)
    }

    pub fn register_user(&self, user: &UserId) {
        self.membership.register_user(user.clone(), self.now());
    }

    pub fn register_user_at(&self, user: &UserId, at: DateTime<Utc>) {
        self.membership.register_user(user.clone(), at);
    }

    pub fn users(&self) -> Vec<UserRecord> {
        self.membership.users()
    }

    pub fn create_squad(&self, squad: &SquadId, name: &str) {
        self.membership.create_squad(squad.clone(), name);
    }

    pub fn squads(&self) -> Vec<SquadRecord> {
        self.membership.squads()
    }

    pub fn join_squad(&self, squad: &SquadId, user: &UserId) -> Result<()> {
        self.membership.join_squad(squad, user, self.now())
    }

    pub fn leave_squad(&self, squad: &SquadId, user: &UserId) -> Result<()> {
        self.membership.leave_squad(squad, user, self.now())
    }

    pub(crate) fn game_store(&self) -> &GameStore {
        &self.games
    }

    pub(crate) fn pick_store(&self) -> &PickStore {
        &self.picks
    }

    pub(crate) fn membership_store(&self) -> &MembershipStore {
        &self.membership
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{Choice, LineSource, Outcome};
    use crate::notify::recording::RecordingNotifier;
    use chrono::{NaiveDate, NaiveTime, TimeZone};

    fn utc(m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, m, d, h, min, 0).unwrap()
    }

    fn schedule() -> SeasonSchedule {
        SeasonSchedule::new(
            2025,
            chrono_tz::America::New_York,
            NaiveDate::from_ymd_opt(2025, 8, 29).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            1,
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            15,
        )
        .unwrap()
    }

    struct Fixture {
        service: PickemService,
        clock: Arc<ManualClock>,
        notifier: Arc<RecordingNotifier>,
    }

    /// Clock starts inside the week-1 window (opens Aug 29 13:00 UTC,
    /// locks Aug 30 16:00 UTC) with a three-game slate and lines posted.
    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(utc(8, 29, 14, 0)));
        let notifier = Arc::new(RecordingNotifier::default());
        let service = PickemService::new(
            schedule(),
            ScoringRules::default(),
            clock.clone(),
            notifier.clone(),
        );
        for (id, kickoff_hour) in [("g1", 16), ("g2", 19), ("g3", 23)] {
            service.upsert_game(Game {
                id: GameId::from(id),
                week: WeekId::new(2025, 1),
                home_team: format!("home-{}", id),
                away_team: format!("away-{}", id),
                kickoff: utc(8, 30, kickoff_hour, 0),
                home_score: None,
                away_score: None,
                completed: false,
            });
            service
                .post_line(Line {
                    game: GameId::from(id),
                    spread_home: -3.0,
                    source: LineSource::Book("consensus".to_string()),
                    posted_at: utc(8, 29, 12, 0),
                })
                .unwrap();
        }
        service.register_user_at(&UserId::from("ann"), utc(8, 28, 12, 0));
        service.register_user_at(&UserId::from("bob"), utc(8, 28, 12, 0));
        Fixture {
            service,
            clock,
            notifier,
        }
    }

    fn week1() -> WeekId {
        WeekId::new(2025, 1)
    }

    fn full_request() -> Vec<PickRequest> {
        ["g1", "g2", "g3"]
            .iter()
            .map(|id| PickRequest {
                game: GameId::from(*id),
                choice: Choice::Home,
            })
            .collect()
    }

    fn finish_games(service: &PickemService) {
        // g1 home wins by 4 (covers -3), g2 home wins by 3 (push on -3),
        // g3 home loses.
        for (id, home, away) in [("g1", 24, 20), ("g2", 23, 20), ("g3", 10, 17)] {
            let mut game = service.game(&GameId::from(id)).unwrap();
            game.home_score = Some(home);
            game.away_score = Some(away);
            game.completed = true;
            service.upsert_game(game);
        }
    }

    #[test]
    fn test_submission_freezes_the_spread() {
        let fx = fixture();
        let ann = UserId::from("ann");
        let set = fx.service.submit_picks(&ann, week1(), &full_request()).unwrap();
        assert!(set.picks.iter().all(|p| p.spread_at_pick == -3.0));

        // The line moves after submission; the stored picks keep -3.0.
        fx.service
            .post_line(Line {
                game: GameId::from("g1"),
                spread_home: -7.5,
                source: LineSource::Book("consensus".to_string()),
                posted_at: utc(8, 29, 15, 0),
            })
            .unwrap();
        let stored = fx.service.pick_set(&ann, week1()).unwrap();
        assert_eq!(stored.pick_for_game(&GameId::from("g1")).unwrap().spread_at_pick, -3.0);

        finish_games(&fx.service);
        fx.clock.set(utc(8, 31, 12, 0));
        fx.service.grade_sweep(Some(week1()));
        let graded = fx.service.pick_set(&ann, week1()).unwrap();
        let g1 = graded.pick_for_game(&GameId::from("g1")).unwrap();
        // 24-20 with the frozen -3.0 covers; the moved -7.5 would not.
        assert_eq!(g1.grade.as_ref().unwrap().outcome, Outcome::Win);
    }

    #[test]
    fn test_submission_closed_after_lock() {
        let fx = fixture();
        fx.clock.set(utc(8, 30, 16, 0));
        let err = fx
            .service
            .submit_picks(&UserId::from("ann"), week1(), &full_request())
            .unwrap_err();
        assert!(matches!(err, PickemError::LockedWindow { .. }));
    }

    #[test]
    fn test_draft_then_submit_then_no_resubmit() {
        let fx = fixture();
        let ann = UserId::from("ann");
        let draft = fx
            .service
            .save_draft(&ann, week1(), &full_request()[..1])
            .unwrap();
        assert_eq!(draft.status, PickStatus::Draft);

        fx.service.submit_picks(&ann, week1(), &full_request()).unwrap();
        let err = fx
            .service
            .submit_picks(&ann, week1(), &full_request())
            .unwrap_err();
        assert!(matches!(err, PickemError::AlreadySubmitted { .. }));
    }

    #[test]
    fn test_sweep_is_idempotent_and_counts() {
        let fx = fixture();
        let ann = UserId::from("ann");
        fx.service.submit_picks(&ann, week1(), &full_request()).unwrap();

        // Nothing final yet: everything pending.
        let report = fx.service.grade_sweep(Some(week1()));
        assert_eq!(report.graded, 0);
        assert_eq!(report.pending, 3);

        finish_games(&fx.service);
        fx.clock.set(utc(8, 31, 12, 0));
        let report = fx.service.grade_sweep(Some(week1()));
        assert_eq!(report.graded, 3);

        // Second sweep grades nothing new.
        let report = fx.service.grade_sweep(Some(week1()));
        assert_eq!(report.graded, 0);
        assert_eq!(report.already_graded, 3);

        let set = fx.service.pick_set(&ann, week1()).unwrap();
        assert_eq!(set.status, PickStatus::Locked);
        let outcomes: Vec<Outcome> = set
            .picks
            .iter()
            .map(|p| p.grade.as_ref().unwrap().outcome)
            .collect();
        assert_eq!(outcomes, vec![Outcome::Win, Outcome::Push, Outcome::Loss]);
    }

    #[test]
    fn test_grade_pick_returns_existing_grade() {
        let fx = fixture();
        let ann = UserId::from("ann");
        fx.service.submit_picks(&ann, week1(), &full_request()).unwrap();
        finish_games(&fx.service);

        let id = PickId {
            user: ann.clone(),
            week: week1(),
            game: GameId::from("g1"),
        };
        let first = fx.service.grade_pick(&id).unwrap();
        let second = fx.service.grade_pick(&id).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.outcome, Outcome::Win);

        // Only one GradePosted event despite two calls.
        let posts = fx
            .notifier
            .take()
            .into_iter()
            .filter(|e| matches!(e, PickemEvent::GradePosted { .. }))
            .count();
        assert_eq!(posts, 1);
    }

    #[test]
    fn test_grade_pick_waits_for_final() {
        let fx = fixture();
        let ann = UserId::from("ann");
        fx.service.submit_picks(&ann, week1(), &full_request()).unwrap();
        let id = PickId {
            user: ann,
            week: week1(),
            game: GameId::from("g1"),
        };
        let err = fx.service.grade_pick(&id).unwrap_err();
        assert!(matches!(err, PickemError::GameNotCompleted { .. }));
    }

    #[test]
    fn test_week_leaderboard_includes_everyone() {
        let fx = fixture();
        let ann = UserId::from("ann");
        fx.service.submit_picks(&ann, week1(), &full_request()).unwrap();
        finish_games(&fx.service);
        fx.clock.set(utc(8, 31, 12, 0));
        fx.service.grade_sweep(Some(week1()));

        let entries = fx
            .service
            .leaderboard(Period::Week(week1()), Audience::Global, MembershipBasis::Current)
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].user, ann);
        assert_eq!(entries[0].wins, 1);
        assert_eq!(entries[0].pushes, 1);
        assert_eq!(entries[0].losses, 1);
        assert_eq!(entries[0].points, 1.5);
        assert_eq!(entries[0].rank, 1);
        // bob never submitted; he still shows with a zero line.
        assert_eq!(entries[1].user, UserId::from("bob"));
        assert_eq!(entries[1].wins + entries[1].losses + entries[1].pushes, 0);
    }

    #[test]
    fn test_backfill_writes_three_graded_losses() {
        let fx = fixture();
        finish_games(&fx.service);
        fx.clock.set(utc(8, 31, 12, 0));

        let bob = UserId::from("bob");
        let set = fx.service.backfill_missing_week(&bob, week1()).unwrap();
        assert_eq!(set.status, PickStatus::Locked);
        assert_eq!(set.submitted_at, utc(8, 30, 16, 0));
        assert_eq!(set.picks.len(), 3);
        assert!(set
            .picks
            .iter()
            .all(|p| p.grade.as_ref().unwrap().outcome == Outcome::Loss));

        // A second backfill is refused.
        let err = fx.service.backfill_missing_week(&bob, week1()).unwrap_err();
        assert!(matches!(err, PickemError::AlreadySubmitted { .. }));
    }

    #[test]
    fn test_backfill_week_skips_submitters_and_late_registrants() {
        let fx = fixture();
        let ann = UserId::from("ann");
        fx.service.submit_picks(&ann, week1(), &full_request()).unwrap();
        // cal registered after the week-1 lock anchor.
        fx.service
            .register_user_at(&UserId::from("cal"), utc(9, 2, 12, 0));
        finish_games(&fx.service);
        fx.clock.set(utc(8, 31, 12, 0));

        let written = fx.service.backfill_week(week1()).unwrap();
        assert_eq!(written, 1);
        assert!(fx.service.pick_set(&UserId::from("bob"), week1()).is_some());
        assert!(fx.service.pick_set(&UserId::from("cal"), week1()).is_none());
    }

    #[test]
    fn test_backfill_requires_complete_slate() {
        let fx = fixture();
        fx.clock.set(utc(8, 31, 12, 0));
        let err = fx
            .service
            .backfill_missing_week(&UserId::from("bob"), week1())
            .unwrap_err();
        assert!(matches!(err, PickemError::GameNotCompleted { .. }));
    }

    #[test]
    fn test_other_season_weeks_are_rejected() {
        let fx = fixture();
        let err = fx
            .service
            .backfill_missing_week(&UserId::from("bob"), WeekId::new(2024, 1))
            .unwrap_err();
        assert!(matches!(err, PickemError::Config(_)));
    }

    #[test]
    fn test_poll_transitions_emits_open_and_lock() {
        let fx = fixture();
        let ann = UserId::from("ann");
        fx.service.submit_picks(&ann, week1(), &full_request()).unwrap();

        // Baseline inside week 1, then jump past the week-1 lock and the
        // week-2 open.
        assert!(fx.service.poll_transitions().is_empty());
        fx.clock.set(utc(9, 5, 14, 0));
        let events = fx.service.poll_transitions();
        assert_eq!(
            events,
            vec![
                PickemEvent::WeekLocked(week1()),
                PickemEvent::WeekOpened(WeekId::new(2025, 2)),
            ]
        );
        assert_eq!(fx.notifier.take(), events);

        // The submitted set went Locked with the anchor crossing.
        assert_eq!(
            fx.service.pick_set(&ann, week1()).unwrap().status,
            PickStatus::Locked
        );

        // Nothing new on an immediate re-poll.
        assert!(fx.service.poll_transitions().is_empty());
    }

    #[test]
    fn test_squad_leaderboard_scopes_by_membership() {
        let fx = fixture();
        let ann = UserId::from("ann");
        let bob = UserId::from("bob");
        let squad = SquadId::from("office");
        fx.service.create_squad(&squad, "The Office");
        fx.service.join_squad(&squad, &ann).unwrap();

        fx.service.submit_picks(&ann, week1(), &full_request()).unwrap();
        fx.service.submit_picks(&bob, week1(), &full_request()).unwrap();
        finish_games(&fx.service);
        fx.clock.set(utc(8, 31, 12, 0));
        fx.service.grade_sweep(Some(week1()));

        let entries = fx
            .service
            .leaderboard(
                Period::Week(week1()),
                Audience::Squad(squad.clone()),
                MembershipBasis::Current,
            )
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user, ann);

        let err = fx.service.leaderboard(
            Period::Week(week1()),
            Audience::Squad(SquadId::from("ghost")),
            MembershipBasis::Current,
        );
        assert!(matches!(err, Err(PickemError::UnknownSquad { .. })));
    }

    #[test]
    fn test_at_submission_basis_counts_only_member_weeks() {
        let fx = fixture();
        let ann = UserId::from("ann");
        let squad = SquadId::from("office");
        fx.service.create_squad(&squad, "The Office");

        // ann submits week 1 before joining the squad.
        fx.service.submit_picks(&ann, week1(), &full_request()).unwrap();
        finish_games(&fx.service);
        fx.clock.set(utc(8, 31, 12, 0));
        fx.service.grade_sweep(Some(week1()));
        fx.service.join_squad(&squad, &ann).unwrap();

        let current = fx
            .service
            .leaderboard(
                Period::Season,
                Audience::Squad(squad.clone()),
                MembershipBasis::Current,
            )
            .unwrap();
        assert_eq!(current[0].wins, 1);

        let strict = fx
            .service
            .leaderboard(
                Period::Season,
                Audience::Squad(squad),
                MembershipBasis::AtSubmission,
            )
            .unwrap();
        // Her membership began after the submission; nothing counts, but
        // she still gets a row for the weeks she has been a member.
        assert_eq!(strict.len(), 1);
        assert_eq!(strict[0].wins + strict[0].losses + strict[0].pushes, 0);
    }
}
