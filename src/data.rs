//! State snapshot and standings export.
//!
//! The CLI wraps every command in load, act, save; the web binary loads
//! once at startup. A missing snapshot file is a fresh season, not an
//! error.

use anyhow::{Context, Result};
use csv::Writer;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

use crate::models::{Game, LeaderboardEntry, Line, PickSet, SquadRecord, UserRecord};
use crate::service::PickemService;

/// Whole-system snapshot: everything the stores hold, nothing derived.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub games: Vec<Game>,
    pub lines: Vec<Line>,
    pub pick_sets: Vec<PickSet>,
    pub users: Vec<UserRecord>,
    pub squads: Vec<SquadRecord>,
}

impl StateSnapshot {
    pub fn capture(service: &PickemService) -> Self {
        let (users, squads) = service.membership_store().export();
        StateSnapshot {
            games: service.all_games(),
            lines: service.all_lines(),
            pick_sets: service.all_pick_sets(),
            users,
            squads,
        }
    }

    pub fn apply(self, service: &PickemService) {
        service.game_store().restore(self.games, self.lines);
        service.pick_store().restore(self.pick_sets);
        service.membership_store().restore(self.users, self.squads);
    }
}

/// Save the whole system state as pretty JSON.
pub fn save_state(service: &PickemService, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context("Failed to create state directory")?;
        }
    }
    let snapshot = StateSnapshot::capture(service);
    let json = serde_json::to_string_pretty(&snapshot).context("Failed to serialize state")?;
    std::fs::write(path, json).context("Failed to write state file")?;
    Ok(())
}

/// Load the snapshot if one exists. Returns whether anything was loaded.
pub fn load_state(service: &PickemService, path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    let json = std::fs::read_to_string(path).context("Failed to read state file")?;
    let snapshot: StateSnapshot =
        serde_json::from_str(&json).context("Failed to deserialize state file")?;
    snapshot.apply(service);
    Ok(true)
}

/// Write standings rows to a CSV file.
pub fn save_standings_to_csv(entries: &[LeaderboardEntry], path: &str) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create CSV file: {}", path))?;
    let mut writer = Writer::from_writer(file);

    writer.write_record(["rank", "user", "wins", "losses", "pushes", "points", "win_pct"])?;
    for entry in entries {
        writer.write_record(&[
            entry.rank.to_string(),
            entry.user.to_string(),
            entry.wins.to_string(),
            entry.losses.to_string(),
            entry.pushes.to_string(),
            format!("{:.1}", entry.points),
            format!("{:.3}", entry.win_pct),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
