//! Runtime configuration from environment variables.
//!
//! Binaries call `dotenv::dotenv().ok()` before `AppConfig::from_env()`, so
//! a `.env` file works the same as the shell environment. Every knob has a
//! default; an unparseable value is a `Config` error, never a panic.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;

use crate::engine::week_window::SeasonSchedule;
use crate::error::{PickemError, Result};

const DEFAULT_SEASON: &str = "2025";
const DEFAULT_TIMEZONE: &str = "America/New_York";
const DEFAULT_FIRST_OPEN: &str = "2025-08-29";
const DEFAULT_OPEN_TIME: &str = "09:00";
const DEFAULT_LOCK_OFFSET_DAYS: &str = "1";
const DEFAULT_LOCK_TIME: &str = "12:00";
const DEFAULT_MAX_WEEKS: &str = "15";
const DEFAULT_STATE_FILE: &str = "cache/pickem_state.json";
const DEFAULT_BIND: &str = "127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub season: i32,
    pub timezone: Tz,
    pub first_open: NaiveDate,
    pub open_time: NaiveTime,
    pub lock_offset_days: u8,
    pub lock_time: NaiveTime,
    pub max_weeks: u8,
    pub state_file: PathBuf,
    pub feed_url: Option<String>,
    pub bind: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let season = parse_num::<i32>("PICKEM_SEASON", &get("PICKEM_SEASON", DEFAULT_SEASON))?;
        let timezone_raw = get("PICKEM_TIMEZONE", DEFAULT_TIMEZONE);
        let timezone: Tz = timezone_raw.parse().map_err(|_| {
            PickemError::Config(format!("PICKEM_TIMEZONE has unknown zone '{}'", timezone_raw))
        })?;
        let first_open = parse_date("PICKEM_FIRST_OPEN", &get("PICKEM_FIRST_OPEN", DEFAULT_FIRST_OPEN))?;
        let open_time = parse_time("PICKEM_OPEN_TIME", &get("PICKEM_OPEN_TIME", DEFAULT_OPEN_TIME))?;
        let lock_offset_days = parse_num::<u8>(
            "PICKEM_LOCK_OFFSET_DAYS",
            &get("PICKEM_LOCK_OFFSET_DAYS", DEFAULT_LOCK_OFFSET_DAYS),
        )?;
        let lock_time = parse_time("PICKEM_LOCK_TIME", &get("PICKEM_LOCK_TIME", DEFAULT_LOCK_TIME))?;
        let max_weeks = parse_num::<u8>("PICKEM_MAX_WEEKS", &get("PICKEM_MAX_WEEKS", DEFAULT_MAX_WEEKS))?;

        Ok(AppConfig {
            season,
            timezone,
            first_open,
            open_time,
            lock_offset_days,
            lock_time,
            max_weeks,
            state_file: PathBuf::from(get("PICKEM_STATE_FILE", DEFAULT_STATE_FILE)),
            feed_url: lookup("PICKEM_FEED_URL"),
            bind: get("PICKEM_BIND", DEFAULT_BIND),
        })
    }

    /// Build the season schedule these settings describe.
    pub fn schedule(&self) -> Result<SeasonSchedule> {
        SeasonSchedule::new(
            self.season,
            self.timezone,
            self.first_open,
            self.open_time,
            self.lock_offset_days,
            self.lock_time,
            self.max_weeks,
        )
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| PickemError::Config(format!("{} has invalid value '{}'", key, raw)))
}

fn parse_date(key: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| PickemError::Config(format!("{} has invalid date '{}'", key, raw)))
}

fn parse_time(key: &str, raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| PickemError::Config(format!("{} has invalid time '{}'", key, raw)))
}
