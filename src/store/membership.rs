//! Users, squads, and membership spans.
//!
//! Spans are the single record of membership. A user currently in a squad
//! has exactly one open span there; leaving closes it and rejoining opens
//! a fresh one, so history survives churn.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::error::{PickemError, Result};
use crate::models::{MembershipSpan, SquadId, SquadRecord, UserId, UserRecord};

#[derive(Debug, Default)]
pub struct MembershipStore {
    users: RwLock<BTreeMap<UserId, UserRecord>>,
    squads: RwLock<HashMap<SquadId, SquadRecord>>,
}

impl MembershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user. Re-registering keeps the original timestamp.
    pub fn register_user(&self, id: UserId, at: DateTime<Utc>) {
        self.users
            .write()
            .unwrap()
            .entry(id.clone())
            .or_insert(UserRecord {
                id,
                registered_at: at,
            });
    }

    pub fn user(&self, id: &UserId) -> Option<UserRecord> {
        self.users.read().unwrap().get(id).cloned()
    }

    /// All registered users in id order.
    pub fn users(&self) -> Vec<UserRecord> {
        self.users.read().unwrap().values().cloned().collect()
    }

    pub fn user_ids(&self) -> Vec<UserId> {
        self.users.read().unwrap().keys().cloned().collect()
    }

    /// Users registered strictly before `cutoff`.
    pub fn registered_before(&self, cutoff: DateTime<Utc>) -> Vec<UserId> {
        self.users
            .read()
            .unwrap()
            .values()
            .filter(|u| u.registered_at < cutoff)
            .map(|u| u.id.clone())
            .collect()
    }

    /// Create a squad if absent; an existing squad keeps its members.
    pub fn create_squad(&self, id: SquadId, name: &str) {
        self.squads
            .write()
            .unwrap()
            .entry(id.clone())
            .or_insert(SquadRecord {
                id,
                name: name.to_string(),
                members: Vec::new(),
            });
    }

    pub fn squad(&self, id: &SquadId) -> Result<SquadRecord> {
        self.squads
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| PickemError::UnknownSquad { squad: id.clone() })
    }

    pub fn squads(&self) -> Vec<SquadRecord> {
        let mut squads: Vec<SquadRecord> = self.squads.read().unwrap().values().cloned().collect();
        squads.sort_by(|a, b| a.id.cmp(&b.id));
        squads
    }

    /// Open a membership span. A user already holding an open span stays
    /// as-is.
    pub fn join_squad(&self, squad: &SquadId, user: &UserId, at: DateTime<Utc>) -> Result<()> {
        let mut squads = self.squads.write().unwrap();
        let record = squads
            .get_mut(squad)
            .ok_or_else(|| PickemError::UnknownSquad {
                squad: squad.clone(),
            })?;
        let already_in = record
            .members
            .iter()
            .any(|m| m.user == *user && m.left_at.is_none());
        if !already_in {
            record.members.push(MembershipSpan {
                user: user.clone(),
                joined_at: at,
                left_at: None,
            });
        }
        Ok(())
    }

    /// Close the user's open span, if any.
    pub fn leave_squad(&self, squad: &SquadId, user: &UserId, at: DateTime<Utc>) -> Result<()> {
        let mut squads = self.squads.write().unwrap();
        let record = squads
            .get_mut(squad)
            .ok_or_else(|| PickemError::UnknownSquad {
                squad: squad.clone(),
            })?;
        if let Some(span) = record
            .members
            .iter_mut()
            .find(|m| m.user == *user && m.left_at.is_none())
        {
            span.left_at = Some(at);
        }
        Ok(())
    }

    /// Users holding an open span, id-ordered.
    pub fn current_members(&self, squad: &SquadId) -> Result<Vec<UserId>> {
        let record = self.squad(squad)?;
        let mut members: Vec<UserId> = record
            .members
            .iter()
            .filter(|m| m.left_at.is_none())
            .map(|m| m.user.clone())
            .collect();
        members.sort();
        members.dedup();
        Ok(members)
    }

    /// Users with any span intersecting `[start, end)`.
    pub fn members_during(
        &self,
        squad: &SquadId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UserId>> {
        let record = self.squad(squad)?;
        let mut members: Vec<UserId> = record
            .members
            .iter()
            .filter(|m| m.intersects(start, end))
            .map(|m| m.user.clone())
            .collect();
        members.sort();
        members.dedup();
        Ok(members)
    }

    /// Whether `user` belonged to `squad` at instant `at`.
    pub fn member_at(&self, squad: &SquadId, user: &UserId, at: DateTime<Utc>) -> Result<bool> {
        let record = self.squad(squad)?;
        Ok(record
            .members
            .iter()
            .any(|m| m.user == *user && m.active_at(at)))
    }

    pub fn export(&self) -> (Vec<UserRecord>, Vec<SquadRecord>) {
        (self.users(), self.squads())
    }

    /// Replace the whole store with snapshot contents.
    pub fn restore(&self, users: Vec<UserRecord>, squads: Vec<SquadRecord>) {
        let mut user_map = self.users.write().unwrap();
        let mut squad_map = self.squads.write().unwrap();
        user_map.clear();
        squad_map.clear();
        for user in users {
            user_map.insert(user.id.clone(), user);
        }
        for squad in squads {
            squad_map.insert(squad.id.clone(), squad);
        }
    }
}
