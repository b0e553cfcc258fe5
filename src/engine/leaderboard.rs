//! Standings aggregation over graded picks.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::models::{LeaderboardEntry, Outcome, Pick, UserId};

/// Running win/loss tally for one user.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Tally {
    pub wins: u32,
    pub losses: u32,
    pub pushes: u32,
    pub points: f64,
}

impl Tally {
    pub fn add(&mut self, outcome: Outcome, points: f64) {
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Push => self.pushes += 1,
        }
        self.points += points;
    }

    pub fn total(&self) -> u32 {
        self.wins + self.losses + self.pushes
    }

    /// Pushes count as half a win. A user with no graded picks sits at 0.
    pub fn win_pct(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (self.wins as f64 + self.pushes as f64 / 2.0) / total as f64
        }
    }
}

/// Fold graded picks into per-user tallies. Every user in `universe` gets a
/// row even with nothing graded; picks from users outside the universe and
/// picks still pending are ignored.
pub fn tally_users<'a>(
    universe: impl IntoIterator<Item = &'a UserId>,
    picks: impl IntoIterator<Item = &'a Pick>,
) -> BTreeMap<UserId, Tally> {
    let mut tallies: BTreeMap<UserId, Tally> = universe
        .into_iter()
        .map(|user| (user.clone(), Tally::default()))
        .collect();
    for pick in picks {
        if let Some(grade) = &pick.grade {
            if let Some(tally) = tallies.get_mut(&pick.id.user) {
                tally.add(grade.outcome, grade.points);
            }
        }
    }
    tallies
}

/// Order tallies into a leaderboard: win percentage descending, total
/// points descending, then user id so equal records always render in the
/// same order. Users equal on both scoring keys share a rank and the next
/// distinct record takes the rank of its position.
pub fn rank(tallies: BTreeMap<UserId, Tally>) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = tallies
        .into_iter()
        .map(|(user, tally)| LeaderboardEntry {
            user,
            wins: tally.wins,
            losses: tally.losses,
            pushes: tally.pushes,
            points: tally.points,
            win_pct: tally.win_pct(),
            rank: 0,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.win_pct
            .partial_cmp(&a.win_pct)
            .unwrap_or(Ordering::Equal)
            .then(b.points.partial_cmp(&a.points).unwrap_or(Ordering::Equal))
            .then(a.user.cmp(&b.user))
    });

    let mut last_key: Option<(f64, f64)> = None;
    let mut last_rank = 0;
    for (position, entry) in entries.iter_mut().enumerate() {
        let key = (entry.win_pct, entry.points);
        if last_key == Some(key) {
            entry.rank = last_rank;
        } else {
            entry.rank = position + 1;
            last_rank = entry.rank;
            last_key = Some(key);
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Choice, GameId, LineSource, Pick, PickGrade, PickId, WeekId};

    fn user(id: &str) -> UserId {
        UserId::from(id)
    }

    fn graded_pick(user_id: &str, game: &str, outcome: Outcome) -> Pick {
        let (points, payout) = match outcome {
            Outcome::Win => (1.0, 1.0),
            Outcome::Push => (0.5, 0.0),
            Outcome::Loss => (0.0, -1.1),
        };
        Pick {
            id: PickId {
                user: user(user_id),
                week: WeekId::new(2025, 1),
                game: GameId::from(game),
            },
            choice: Choice::Home,
            spread_at_pick: -3.0,
            line_source: LineSource::Book("consensus".to_string()),
            grade: Some(PickGrade {
                outcome,
                result: String::new(),
                points,
                payout,
            }),
        }
    }

    fn pending_pick(user_id: &str, game: &str) -> Pick {
        let mut pick = graded_pick(user_id, game, Outcome::Win);
        pick.grade = None;
        pick
    }

    #[test]
    fn test_win_pct_counts_pushes_as_half() {
        let mut tally = Tally::default();
        tally.add(Outcome::Win, 1.0);
        tally.add(Outcome::Loss, 0.0);
        tally.add(Outcome::Push, 0.5);
        assert_eq!(tally.total(), 3);
        assert_eq!(tally.win_pct(), 0.5);
    }

    #[test]
    fn test_empty_tally_has_zero_pct() {
        assert_eq!(Tally::default().win_pct(), 0.0);
    }

    #[test]
    fn test_pending_picks_are_invisible() {
        let users = [user("ann")];
        let picks = vec![
            graded_pick("ann", "g1", Outcome::Win),
            pending_pick("ann", "g2"),
        ];
        let tallies = tally_users(users.iter(), picks.iter());
        let ann = &tallies[&user("ann")];
        assert_eq!(ann.total(), 1);
        assert_eq!(ann.wins, 1);
    }

    #[test]
    fn test_universe_defines_the_rows() {
        let users = [user("ann"), user("bob")];
        // cal's picks fall outside the universe and are dropped.
        let picks = vec![
            graded_pick("ann", "g1", Outcome::Win),
            graded_pick("cal", "g1", Outcome::Win),
        ];
        let tallies = tally_users(users.iter(), picks.iter());
        assert_eq!(tallies.len(), 2);
        assert_eq!(tallies[&user("bob")].total(), 0);
        assert!(!tallies.contains_key(&user("cal")));
    }

    #[test]
    fn test_ranking_orders_by_pct_then_points() {
        let users = [user("ann"), user("bob"), user("cal")];
        // ann 3-0 over one week, bob 6-0 over two weeks: same pct, more
        // points puts bob first.
        let mut picks = Vec::new();
        for game in ["a1", "a2", "a3"] {
            picks.push(graded_pick("ann", game, Outcome::Win));
        }
        for game in ["b1", "b2", "b3", "b4", "b5", "b6"] {
            picks.push(graded_pick("bob", game, Outcome::Win));
        }
        picks.push(graded_pick("cal", "c1", Outcome::Loss));

        let entries = rank(tally_users(users.iter(), picks.iter()));
        assert_eq!(entries[0].user, user("bob"));
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[1].user, user("ann"));
        assert_eq!(entries[1].rank, 2);
        assert_eq!(entries[2].user, user("cal"));
        assert_eq!(entries[2].rank, 3);
    }

    #[test]
    fn test_equal_records_share_rank_and_sort_by_id() {
        let users = [user("dee"), user("ann"), user("bob")];
        let picks = vec![
            graded_pick("dee", "g1", Outcome::Win),
            graded_pick("ann", "h1", Outcome::Win),
            graded_pick("bob", "i1", Outcome::Loss),
        ];
        let entries = rank(tally_users(users.iter(), picks.iter()));
        assert_eq!(entries[0].user, user("ann"));
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[1].user, user("dee"));
        assert_eq!(entries[1].rank, 1);
        assert_eq!(entries[2].user, user("bob"));
        assert_eq!(entries[2].rank, 3);
    }

    #[test]
    fn test_zero_stat_users_still_listed() {
        let users = [user("ann"), user("zoe")];
        let picks = vec![graded_pick("ann", "g1", Outcome::Loss)];
        let entries = rank(tally_users(users.iter(), picks.iter()));
        // ann lost her only pick; pct 0 ties zoe, points tie at 0, id
        // breaks the display order and they share rank 1.
        assert_eq!(entries[0].user, user("ann"));
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[1].user, user("zoe"));
        assert_eq!(entries[1].rank, 1);
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let users = [user("ann"), user("bob"), user("cal"), user("dee")];
        let picks = vec![
            graded_pick("ann", "g1", Outcome::Win),
            graded_pick("bob", "g2", Outcome::Win),
            graded_pick("cal", "g3", Outcome::Push),
            graded_pick("dee", "g4", Outcome::Loss),
        ];
        let first = rank(tally_users(users.iter(), picks.iter()));
        let second = rank(tally_users(users.iter(), picks.iter()));
        assert_eq!(first, second);
    }
}
