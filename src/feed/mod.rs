//! Result-feed adapter: pulls schedules, scores, and spread quotes from an
//! upstream JSON feed and replays them into the service. This is the only
//! path that writes games or lines.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::models::{Game, GameId, Line, LineSource, WeekId};
use crate::service::PickemService;

/// One week's payload as the feed serves it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedWeek {
    pub season: i32,
    pub week: u8,
    pub games: Vec<FeedGame>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedGame {
    pub id: String,
    pub home_team: String,
    pub away_team: String,
    pub kickoff: DateTime<Utc>,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub completed: bool,
    /// Home-perspective spread, when the feed carries a quote.
    pub spread_home: Option<f64>,
    pub book: Option<String>,
    pub line_posted_at: Option<DateTime<Utc>>,
}

/// Counters from one feed application.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedImport {
    pub games: usize,
    pub lines: usize,
}

pub struct FeedClient {
    client: Client,
    base_url: String,
}

impl FeedClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    pub async fn fetch_week(&self, season: i32, week: u8) -> Result<FeedWeek, reqwest::Error> {
        let url = format!("{}/season/{}/week/{}", self.base_url, season, week);
        let response = self.client.get(&url).send().await?;
        let payload: FeedWeek = response.json().await?;
        Ok(payload)
    }
}

/// Replay one feed payload into the service: upsert every game, then post
/// whatever quotes it carries. Quotes without a posting time are stamped
/// at arrival.
pub fn apply_feed_week(service: &PickemService, payload: FeedWeek) -> Result<FeedImport> {
    let week = WeekId::new(payload.season, payload.week);
    let mut report = FeedImport::default();

    for feed_game in payload.games {
        let id = GameId(feed_game.id.clone());
        service.upsert_game(Game {
            id: id.clone(),
            week,
            home_team: feed_game.home_team,
            away_team: feed_game.away_team,
            kickoff: feed_game.kickoff,
            home_score: feed_game.home_score,
            away_score: feed_game.away_score,
            completed: feed_game.completed,
        });
        report.games += 1;

        if let Some(spread_home) = feed_game.spread_home {
            let source = LineSource::Book(
                feed_game.book.unwrap_or_else(|| "feed".to_string()),
            );
            service
                .post_line(Line {
                    game: id.clone(),
                    spread_home,
                    source,
                    posted_at: feed_game.line_posted_at.unwrap_or_else(Utc::now),
                })
                .with_context(|| format!("Failed to post line for game {}", id))?;
            report.lines += 1;
        }
    }

    info!(
        "feed applied for {}: {} games, {} lines",
        week, report.games, report.lines
    );
    Ok(report)
}

/// Import a feed payload from a JSON file on disk.
pub fn import_feed_file(service: &PickemService, path: &Path) -> Result<FeedImport> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read feed file {}", path.display()))?;
    let payload: FeedWeek =
        serde_json::from_str(&json).context("Failed to parse feed payload")?;
    apply_feed_week(service, payload)
}
