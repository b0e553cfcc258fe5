//! Maps wall-clock time to the active competition week and its
//! open/locked state.
//!
//! All anchor math happens in a single fixed reference timezone, never the
//! host's local zone. `window_state` is a pure function of the instant plus
//! this static configuration, so tests can replay any moment of the season.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{PickemError, Result};
use crate::models::{WeekId, WindowState};

/// Static season configuration: when week 1 opens, the weekly open/lock
/// cadence, and how many weeks the season runs.
#[derive(Debug, Clone)]
pub struct SeasonSchedule {
    season: i32,
    timezone: Tz,
    first_open: NaiveDate,
    open_time: NaiveTime,
    lock_day_offset: u8,
    lock_time: NaiveTime,
    max_weeks: u8,
}

impl SeasonSchedule {
    /// Build a validated schedule. `first_open` is the local date of week
    /// 1's open anchor; each later week opens exactly seven days after the
    /// previous one and locks `lock_day_offset` days past its open, at
    /// `lock_time` local.
    pub fn new(
        season: i32,
        timezone: Tz,
        first_open: NaiveDate,
        open_time: NaiveTime,
        lock_day_offset: u8,
        lock_time: NaiveTime,
        max_weeks: u8,
    ) -> Result<Self> {
        if max_weeks == 0 {
            return Err(PickemError::Config("max_weeks must be at least 1".into()));
        }
        if lock_day_offset > 6 {
            return Err(PickemError::Config(format!(
                "lock_day_offset {} would put the lock past the next open anchor",
                lock_day_offset
            )));
        }
        if lock_day_offset == 0 && lock_time <= open_time {
            return Err(PickemError::Config(
                "lock anchor must fall strictly after the open anchor".into(),
            ));
        }
        Ok(Self {
            season,
            timezone,
            first_open,
            open_time,
            lock_day_offset,
            lock_time,
            max_weeks,
        })
    }

    pub fn season(&self) -> i32 {
        self.season
    }

    pub fn max_weeks(&self) -> u8 {
        self.max_weeks
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn week(&self, number: u8) -> WeekId {
        WeekId::new(self.season, number)
    }

    /// The instant week `number`'s submission window opens.
    pub fn open_anchor(&self, number: u8) -> DateTime<Utc> {
        let date = self.first_open + Duration::days(7 * (number as i64 - 1));
        self.localize(date, self.open_time).with_timezone(&Utc)
    }

    /// The instant week `number` locks. The lock instant itself is closed.
    pub fn lock_anchor(&self, number: u8) -> DateTime<Utc> {
        let date = self.first_open
            + Duration::days(7 * (number as i64 - 1) + self.lock_day_offset as i64);
        self.localize(date, self.lock_time).with_timezone(&Utc)
    }

    /// Which week `now` falls in and whether its window is open or locked.
    ///
    /// Week numbering advances exactly at each open anchor, independent of
    /// game completion. Instants before the season opener map to week 1
    /// (neither open nor locked); instants past the final week clamp there.
    pub fn window_state(&self, now: DateTime<Utc>) -> WindowState {
        let season_open = self.open_anchor(1);
        let mut number = if now < season_open {
            1
        } else {
            let local_date = now.with_timezone(&self.timezone).date_naive();
            let days = (local_date - self.first_open).num_days();
            (days.div_euclid(7) + 1).clamp(1, self.max_weeks as i64) as u8
        };
        // The date estimate can be off by one near the anchor hour; settle
        // against the exact open instants.
        while number < self.max_weeks && now >= self.open_anchor(number + 1) {
            number += 1;
        }
        while number > 1 && now < self.open_anchor(number) {
            number -= 1;
        }

        let opens_at = self.open_anchor(number);
        let locks_at = self.lock_anchor(number);
        WindowState {
            week: self.week(number),
            is_open: now >= opens_at && now < locks_at,
            is_locked: now >= locks_at,
            opens_at,
            locks_at,
        }
    }

    pub fn current_week(&self, now: DateTime<Utc>) -> WeekId {
        self.window_state(now).week
    }

    /// Whether `week`'s lock anchor has passed at `now`. Weeks of past
    /// seasons count as locked, future seasons as not yet locked.
    pub fn is_locked_for(&self, week: WeekId, now: DateTime<Utc>) -> bool {
        if week.season != self.season {
            return week.season < self.season;
        }
        let number = week.number.clamp(1, self.max_weeks);
        now >= self.lock_anchor(number)
    }

    /// Resolve a local wall-clock datetime in the reference zone. Ambiguous
    /// times (fall-back) take the earlier mapping; nonexistent times
    /// (spring-forward) shift ahead one hour.
    fn localize(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Tz> {
        let naive = date.and_time(time);
        match self.timezone.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => self
                .timezone
                .from_local_datetime(&(naive + Duration::hours(1)))
                .earliest()
                .unwrap_or_else(|| self.timezone.from_utc_datetime(&naive)),
        }
    }
}
