//! In-memory store.
//!
//! Every operation takes one mutex, which serializes counter updates
//! per store instance. Each instance is isolated; there is no shared
//! global store.

use super::ledger::Ledger;
use super::{most_recent, CompletionOutcome, Store};
use crate::progression::Completion;
use crate::{
    BadgeType, CravingEntry, Error, ExerciseSession, NewCravingEntry, NewExerciseSession,
    NewUser, Result, StatsPatch, User, UserBadge, UserStats,
};
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    ledger: Ledger,
    cravings: Vec<CravingEntry>,
    sessions: Vec<ExerciseSession>,
}

/// Store backed by process memory
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // Ledger methods check everything before their first write
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Store for MemoryStore {
    fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables().ledger.user(id))
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.tables().ledger.user_by_email(email))
    }

    fn create_user(&self, new: NewUser) -> Result<User> {
        let user = self.tables().ledger.create_user(new, Utc::now())?;
        tracing::debug!("Created user {}", user.id);
        Ok(user)
    }

    fn update_user_stats(&self, user_id: Uuid, patch: &StatsPatch) -> Result<UserStats> {
        self.tables().ledger.update_stats(user_id, patch, Utc::now())
    }

    fn get_user_stats(&self, user_id: Uuid) -> Result<Option<UserStats>> {
        Ok(self.tables().ledger.stats(user_id))
    }

    fn create_craving_entry(&self, new: NewCravingEntry) -> Result<CravingEntry> {
        let mut tables = self.tables();
        if !tables.ledger.contains_user(new.user_id) {
            return Err(Error::user_not_found(new.user_id));
        }

        let entry = CravingEntry {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            intensity: new.intensity,
            triggers: new.triggers,
            emotions: new.emotions,
            notes: new.notes,
            created_at: new.created_at.unwrap_or_else(Utc::now),
        };
        tables.cravings.push(entry.clone());
        Ok(entry)
    }

    fn get_craving_entries(&self, user_id: Uuid, limit: usize) -> Result<Vec<CravingEntry>> {
        let rows = self
            .tables()
            .cravings
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        Ok(most_recent(rows, limit, |e: &CravingEntry| e.created_at))
    }

    fn create_exercise_session(&self, new: NewExerciseSession) -> Result<ExerciseSession> {
        let mut tables = self.tables();
        if !tables.ledger.contains_user(new.user_id) {
            return Err(Error::user_not_found(new.user_id));
        }

        let session = ExerciseSession {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            exercise_id: new.exercise_id,
            duration: new.duration,
            completed: new.completed,
            craving_before: new.craving_before,
            craving_after: new.craving_after,
            created_at: new.created_at.unwrap_or_else(Utc::now),
        };
        tables.sessions.push(session.clone());
        Ok(session)
    }

    fn get_exercise_sessions(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ExerciseSession>> {
        let rows = self
            .tables()
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        Ok(most_recent(rows, limit, |s: &ExerciseSession| s.created_at))
    }

    fn get_user_badges(&self, user_id: Uuid) -> Result<Vec<UserBadge>> {
        Ok(self.tables().ledger.badges(user_id))
    }

    fn award_badge(&self, user_id: Uuid, badge_type: BadgeType) -> Result<UserBadge> {
        let (badge, _) = self
            .tables()
            .ledger
            .award_badge(user_id, badge_type, Utc::now())?;
        Ok(badge)
    }

    fn apply_completion(&self, completion: &Completion) -> Result<CompletionOutcome> {
        self.tables().ledger.apply_completion(completion, Utc::now())
    }
}
