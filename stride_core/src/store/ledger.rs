//! Mutable per-user rows shared by both store backends.
//!
//! A `Ledger` holds users, stats, badges and the set of applied session
//! ids. Backends wrap it in their own serialization (a mutex, or an
//! exclusively locked state file) so every method here runs as one
//! atomic step.

use super::{email_key, CompletionOutcome};
use crate::progression::{level_for_points, Completion};
use crate::{BadgeType, Error, NewUser, Result, StatsPatch, User, UserBadge, UserStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct Ledger {
    #[serde(default)]
    users: HashMap<Uuid, User>,
    #[serde(default)]
    stats: HashMap<Uuid, UserStats>,
    #[serde(default)]
    badges: Vec<UserBadge>,
    #[serde(default)]
    applied_sessions: HashSet<Uuid>,
}

impl Ledger {
    pub fn user(&self, id: Uuid) -> Option<User> {
        self.users.get(&id).cloned()
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        let key = email_key(email);
        self.users
            .values()
            .find(|u| u.email.as_deref().map(email_key).as_deref() == Some(key.as_str()))
            .cloned()
    }

    pub fn contains_user(&self, id: Uuid) -> bool {
        self.users.contains_key(&id)
    }

    /// Insert a user and its zeroed stats row; both or neither
    pub fn create_user(&mut self, new: NewUser, now: DateTime<Utc>) -> Result<User> {
        if let Some(email) = new.email.as_deref() {
            if self.user_by_email(email).is_some() {
                return Err(Error::ValidationFailed(format!(
                    "email already registered: {}",
                    email
                )));
            }
        }

        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            first_name: new.first_name,
            last_name: new.last_name,
            points: 0,
            level: level_for_points(0),
            created_at: now,
            updated_at: now,
        };

        self.stats.insert(user.id, UserStats::zeroed(user.id, now));
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    pub fn stats(&self, user_id: Uuid) -> Option<UserStats> {
        self.stats.get(&user_id).cloned()
    }

    pub fn update_stats(
        &mut self,
        user_id: Uuid,
        patch: &StatsPatch,
        now: DateTime<Utc>,
    ) -> Result<UserStats> {
        let current = self
            .stats
            .get_mut(&user_id)
            .ok_or_else(|| Error::stats_not_found(user_id))?;
        *current = current.merged(patch, now);
        Ok(current.clone())
    }

    pub fn badges(&self, user_id: Uuid) -> Vec<UserBadge> {
        let mut badges: Vec<_> = self
            .badges
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        badges.sort_by(|a, b| b.earned_at.cmp(&a.earned_at));
        badges
    }

    /// Award a badge once. The flag reports whether a row was inserted.
    pub fn award_badge(
        &mut self,
        user_id: Uuid,
        badge_type: BadgeType,
        now: DateTime<Utc>,
    ) -> Result<(UserBadge, bool)> {
        if !self.users.contains_key(&user_id) {
            return Err(Error::user_not_found(user_id));
        }

        if let Some(existing) = self
            .badges
            .iter()
            .find(|b| b.user_id == user_id && b.badge_type == badge_type)
        {
            return Ok((existing.clone(), false));
        }

        let badge = UserBadge {
            id: Uuid::new_v4(),
            user_id,
            badge_type,
            earned_at: now,
        };
        self.badges.push(badge.clone());
        Ok((badge, true))
    }

    /// Increment stats and points for a completed session, at most once
    pub fn apply_completion(
        &mut self,
        completion: &Completion,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome> {
        let user_id = completion.user_id;
        let user = self
            .users
            .get(&user_id)
            .ok_or_else(|| Error::user_not_found(user_id))?;
        let stats = self
            .stats
            .get(&user_id)
            .ok_or_else(|| Error::stats_not_found(user_id))?;

        if self.applied_sessions.contains(&completion.session_id) {
            return Ok(CompletionOutcome::AlreadyApplied {
                user: user.clone(),
                stats: stats.clone(),
            });
        }

        let points = user.points.saturating_add(completion.points);
        let user = User {
            points,
            level: level_for_points(points),
            updated_at: now,
            ..user.clone()
        };
        let stats = stats.merged(
            &StatsPatch {
                exercises_completed: Some(stats.exercises_completed.saturating_add(1)),
                total_duration: Some(stats.total_duration.saturating_add(completion.duration)),
                ..Default::default()
            },
            now,
        );

        self.users.insert(user_id, user.clone());
        self.stats.insert(user_id, stats.clone());
        self.applied_sessions.insert(completion.session_id);

        Ok(CompletionOutcome::Applied { user, stats })
    }
}
