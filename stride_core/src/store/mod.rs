//! Persistence port consumed by the engine.
//!
//! Two backends implement [`Store`]: [`MemoryStore`] for tests and
//! embedding, and [`FileStore`] for durable local data. The engine
//! cannot tell them apart.

mod file;
mod jsonl;
mod ledger;
mod memory;

pub use file::FileStore;
pub use jsonl::JsonlLog;
pub use memory::MemoryStore;

use crate::progression::Completion;
use crate::{
    BadgeType, CravingEntry, ExerciseSession, NewCravingEntry, NewExerciseSession, NewUser,
    Result, StatsPatch, User, UserBadge, UserStats,
};
use std::sync::Arc;
use uuid::Uuid;

/// Result of applying a [`Completion`]
#[derive(Clone, Debug, PartialEq)]
pub enum CompletionOutcome {
    /// Counters were incremented by this call
    Applied { user: User, stats: UserStats },
    /// The session had been applied before; nothing changed
    AlreadyApplied { user: User, stats: UserStats },
}

impl CompletionOutcome {
    pub fn user(&self) -> &User {
        match self {
            CompletionOutcome::Applied { user, .. }
            | CompletionOutcome::AlreadyApplied { user, .. } => user,
        }
    }

    pub fn stats(&self) -> &UserStats {
        match self {
            CompletionOutcome::Applied { stats, .. }
            | CompletionOutcome::AlreadyApplied { stats, .. } => stats,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, CompletionOutcome::Applied { .. })
    }
}

/// Storage contract for users, the event log, derived stats and badges.
///
/// Lists are returned most-recent-first and truncated to `limit`.
/// Creating log rows is append-only and never idempotent; every other
/// mutation is safe to repeat with the same inputs.
pub trait Store: Send + Sync {
    fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Create a user together with its zero-valued stats row
    fn create_user(&self, new: NewUser) -> Result<User>;

    /// Merge the supplied fields into an existing stats row
    fn update_user_stats(&self, user_id: Uuid, patch: &StatsPatch) -> Result<UserStats>;

    fn get_user_stats(&self, user_id: Uuid) -> Result<Option<UserStats>>;

    fn create_craving_entry(&self, new: NewCravingEntry) -> Result<CravingEntry>;

    fn get_craving_entries(&self, user_id: Uuid, limit: usize) -> Result<Vec<CravingEntry>>;

    fn create_exercise_session(&self, new: NewExerciseSession) -> Result<ExerciseSession>;

    fn get_exercise_sessions(&self, user_id: Uuid, limit: usize)
        -> Result<Vec<ExerciseSession>>;

    fn get_user_badges(&self, user_id: Uuid) -> Result<Vec<UserBadge>>;

    /// Award a badge, returning the existing row if it is already held
    fn award_badge(&self, user_id: Uuid, badge_type: BadgeType) -> Result<UserBadge>;

    /// Atomically increment stats and points for one completed session.
    ///
    /// Both rows change together or not at all, and a session id that
    /// was applied before yields [`CompletionOutcome::AlreadyApplied`].
    fn apply_completion(&self, completion: &Completion) -> Result<CompletionOutcome>;
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        (**self).get_user(id)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        (**self).get_user_by_email(email)
    }

    fn create_user(&self, new: NewUser) -> Result<User> {
        (**self).create_user(new)
    }

    fn update_user_stats(&self, user_id: Uuid, patch: &StatsPatch) -> Result<UserStats> {
        (**self).update_user_stats(user_id, patch)
    }

    fn get_user_stats(&self, user_id: Uuid) -> Result<Option<UserStats>> {
        (**self).get_user_stats(user_id)
    }

    fn create_craving_entry(&self, new: NewCravingEntry) -> Result<CravingEntry> {
        (**self).create_craving_entry(new)
    }

    fn get_craving_entries(&self, user_id: Uuid, limit: usize) -> Result<Vec<CravingEntry>> {
        (**self).get_craving_entries(user_id, limit)
    }

    fn create_exercise_session(&self, new: NewExerciseSession) -> Result<ExerciseSession> {
        (**self).create_exercise_session(new)
    }

    fn get_exercise_sessions(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ExerciseSession>> {
        (**self).get_exercise_sessions(user_id, limit)
    }

    fn get_user_badges(&self, user_id: Uuid) -> Result<Vec<UserBadge>> {
        (**self).get_user_badges(user_id)
    }

    fn award_badge(&self, user_id: Uuid, badge_type: BadgeType) -> Result<UserBadge> {
        (**self).award_badge(user_id, badge_type)
    }

    fn apply_completion(&self, completion: &Completion) -> Result<CompletionOutcome> {
        (**self).apply_completion(completion)
    }
}

/// Normalize an email for uniqueness checks
pub(crate) fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Sort rows given in insertion order newest first, keeping at most `limit`.
///
/// Rows sharing a timestamp keep reverse insertion order.
pub(crate) fn most_recent<T, F>(mut rows: Vec<T>, limit: usize, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> chrono::DateTime<chrono::Utc>,
{
    rows.reverse();
    rows.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    rows.truncate(limit);
    rows
}
