//! Pick set storage: the one piece of mutable state the lifecycle owns.
//!
//! Uniqueness of (user, week) is the map key. Every compare-and-write
//! (draft overwrite on submit, the single grade write, lock transitions)
//! happens inside one write-lock critical section so no application-level
//! locking is needed above the store.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{PickemError, Result};
use crate::models::{PickGrade, PickId, PickSet, PickStatus, UserId, WeekId};

/// Which way a conditional grade write went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeWrite {
    Applied,
    AlreadyGraded,
}

#[derive(Debug, Default)]
pub struct PickStore {
    sets: RwLock<HashMap<(UserId, WeekId), PickSet>>,
}

impl PickStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a submission. The draft check and the overwrite are one
    /// atomic step: an existing draft is replaced whole, anything already
    /// submitted or locked wins with `AlreadySubmitted`.
    pub fn commit_submission(&self, set: PickSet) -> Result<()> {
        debug_assert_eq!(set.status, PickStatus::Submitted);
        let mut sets = self.sets.write().unwrap();
        let key = (set.user.clone(), set.week);
        if let Some(existing) = sets.get(&key) {
            if existing.status != PickStatus::Draft {
                return Err(PickemError::AlreadySubmitted {
                    user: set.user.clone(),
                    week: set.week,
                });
            }
        }
        sets.insert(key, set);
        Ok(())
    }

    /// Save or replace a draft. Refused once a real submission exists.
    pub fn save_draft(&self, set: PickSet) -> Result<()> {
        debug_assert_eq!(set.status, PickStatus::Draft);
        let mut sets = self.sets.write().unwrap();
        let key = (set.user.clone(), set.week);
        if let Some(existing) = sets.get(&key) {
            if existing.status != PickStatus::Draft {
                return Err(PickemError::AlreadySubmitted {
                    user: set.user.clone(),
                    week: set.week,
                });
            }
        }
        sets.insert(key, set);
        Ok(())
    }

    /// Insert a penalty backfill set. Any existing set for the key, draft
    /// included, blocks it.
    pub fn insert_backfill(&self, set: PickSet) -> Result<()> {
        let mut sets = self.sets.write().unwrap();
        let key = (set.user.clone(), set.week);
        if sets.contains_key(&key) {
            return Err(PickemError::AlreadySubmitted {
                user: set.user.clone(),
                week: set.week,
            });
        }
        sets.insert(key, set);
        Ok(())
    }

    /// Write a grade if and only if the pick has none. Concurrent sweeps
    /// race here; exactly one caller sees `Applied`.
    pub fn apply_grade(&self, pick: &PickId, grade: PickGrade) -> Result<GradeWrite> {
        let mut sets = self.sets.write().unwrap();
        let set = sets
            .get_mut(&(pick.user.clone(), pick.week))
            .ok_or_else(|| PickemError::PickSetNotFound {
                user: pick.user.clone(),
                week: pick.week,
            })?;
        let slot = set
            .picks
            .iter_mut()
            .find(|p| p.id.game == pick.game)
            .ok_or_else(|| PickemError::PickNotFound { pick: pick.clone() })?;
        if slot.grade.is_some() {
            return Ok(GradeWrite::AlreadyGraded);
        }
        slot.grade = Some(grade);
        Ok(GradeWrite::Applied)
    }

    /// Flip submitted sets to locked for every week `past_lock` reports as
    /// wrapped. Returns how many sets changed.
    pub fn apply_due_locks(&self, past_lock: impl Fn(WeekId) -> bool) -> usize {
        let mut sets = self.sets.write().unwrap();
        let mut flipped = 0;
        for set in sets.values_mut() {
            if set.status == PickStatus::Submitted && past_lock(set.week) {
                set.status = PickStatus::Locked;
                flipped += 1;
            }
        }
        flipped
    }

    pub fn set_for(&self, user: &UserId, week: WeekId) -> Option<PickSet> {
        self.sets
            .read()
            .unwrap()
            .get(&(user.clone(), week))
            .cloned()
    }

    pub fn require_set(&self, user: &UserId, week: WeekId) -> Result<PickSet> {
        self.set_for(user, week)
            .ok_or_else(|| PickemError::PickSetNotFound {
                user: user.clone(),
                week,
            })
    }

    /// Every set for a week, user-ordered.
    pub fn sets_for_week(&self, week: WeekId) -> Vec<PickSet> {
        let mut sets: Vec<PickSet> = self
            .sets
            .read()
            .unwrap()
            .values()
            .filter(|s| s.week == week)
            .cloned()
            .collect();
        sets.sort_by(|a, b| a.user.cmp(&b.user));
        sets
    }

    /// Every set in `season` up to and including week `last`, ordered by
    /// (week, user).
    pub fn sets_through_week(&self, season: i32, last: u8) -> Vec<PickSet> {
        let mut sets: Vec<PickSet> = self
            .sets
            .read()
            .unwrap()
            .values()
            .filter(|s| s.week.season == season && s.week.number <= last)
            .cloned()
            .collect();
        sets.sort_by(|a, b| (a.week, &a.user).cmp(&(b.week, &b.user)));
        sets
    }

    /// Users holding any set for a week, draft or otherwise.
    pub fn users_with_sets(&self, week: WeekId) -> Vec<UserId> {
        let mut users: Vec<UserId> = self
            .sets
            .read()
            .unwrap()
            .values()
            .filter(|s| s.week == week)
            .map(|s| s.user.clone())
            .collect();
        users.sort();
        users
    }

    /// All sets ordered by (week, user), for snapshots.
    pub fn all_sets(&self) -> Vec<PickSet> {
        let mut sets: Vec<PickSet> = self.sets.read().unwrap().values().cloned().collect();
        sets.sort_by(|a, b| (a.week, &a.user).cmp(&(b.week, &b.user)));
        sets
    }

    /// Replace the whole store with snapshot contents.
    pub fn restore(&self, incoming: Vec<PickSet>) {
        let mut sets = self.sets.write().unwrap();
        sets.clear();
        for set in incoming {
            sets.insert((set.user.clone(), set.week), set);
        }
    }
}
