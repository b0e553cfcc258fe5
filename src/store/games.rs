//! Game and line storage.
//!
//! The result feed owns every write here; the lifecycle core only reads.
//! Line history is append-only so a frozen `spread_at_pick` can always be
//! traced back to the quote it came from.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::error::{PickemError, Result};
use crate::models::{Game, GameId, Line, WeekId};

#[derive(Debug, Default)]
pub struct GameStore {
    games: RwLock<HashMap<GameId, Game>>,
    lines: RwLock<HashMap<GameId, Vec<Line>>>,
}

impl GameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a game record. Score updates from later feed
    /// pulls arrive through the same call.
    pub fn upsert_game(&self, game: Game) {
        self.games.write().unwrap().insert(game.id.clone(), game);
    }

    pub fn game(&self, id: &GameId) -> Option<Game> {
        self.games.read().unwrap().get(id).cloned()
    }

    pub fn require_game(&self, id: &GameId) -> Result<Game> {
        self.game(id)
            .ok_or_else(|| PickemError::UnknownGame { game: id.clone() })
    }

    /// The week's slate in kickoff order.
    pub fn games_for_week(&self, week: WeekId) -> Vec<Game> {
        let mut games: Vec<Game> = self
            .games
            .read()
            .unwrap()
            .values()
            .filter(|g| g.week == week)
            .cloned()
            .collect();
        games.sort_by(|a, b| a.kickoff.cmp(&b.kickoff).then_with(|| a.id.cmp(&b.id)));
        games
    }

    /// Append a line quote for a known game. History is never rewritten; a
    /// correction is just a newer quote.
    pub fn post_line(&self, line: Line) -> Result<()> {
        if !self.games.read().unwrap().contains_key(&line.game) {
            return Err(PickemError::UnknownGame {
                game: line.game.clone(),
            });
        }
        let mut lines = self.lines.write().unwrap();
        let history = lines.entry(line.game.clone()).or_default();
        history.push(line);
        history.sort_by_key(|l| l.posted_at);
        Ok(())
    }

    /// The line in effect at `at`: the latest quote posted at or before it.
    pub fn line_in_effect(&self, game: &GameId, at: DateTime<Utc>) -> Option<Line> {
        let lines = self.lines.read().unwrap();
        lines
            .get(game)?
            .iter()
            .rev()
            .find(|l| l.posted_at <= at)
            .cloned()
    }

    pub fn lines_for(&self, game: &GameId) -> Vec<Line> {
        self.lines
            .read()
            .unwrap()
            .get(game)
            .cloned()
            .unwrap_or_default()
    }

    /// Every known game, ordered for stable listings and snapshots.
    pub fn all_games(&self) -> Vec<Game> {
        let mut games: Vec<Game> = self.games.read().unwrap().values().cloned().collect();
        games.sort_by(|a, b| (a.week, &a.id).cmp(&(b.week, &b.id)));
        games
    }

    /// Every line quote, game-major in posting order.
    pub fn all_lines(&self) -> Vec<Line> {
        let lines = self.lines.read().unwrap();
        let mut keys: Vec<&GameId> = lines.keys().collect();
        keys.sort();
        keys.into_iter()
            .flat_map(|k| lines[k].iter().cloned())
            .collect()
    }

    /// Replace the whole store with snapshot contents.
    pub fn restore(&self, games: Vec<Game>, lines: Vec<Line>) {
        let mut game_map = self.games.write().unwrap();
        let mut line_map = self.lines.write().unwrap();
        game_map.clear();
        line_map.clear();
        for game in games {
            game_map.insert(game.id.clone(), game);
        }
        for line in lines {
            line_map.entry(line.game.clone()).or_default().push(line);
        }
        for history in line_map.values_mut() {
            history.sort_by_key(|l| l.posted_at);
        }
    }
}
