//! Orchestration of inbound events.
//!
//! The engine reacts to two events:
//! - a craving entry: append it, refresh the cached average, re-check badges
//! - an exercise session: append it, and if completed apply the
//!   progression increment, refresh streaks, re-check badges
//!
//! The log write always comes first and stands on its own. Everything
//! after it is derived state: a failure there is reported next to the
//! persisted record and can be repaired by replaying
//! [`Engine::complete_session`] or calling [`Engine::rebuild_stats`].

use crate::badges::{qualifying_badges, BadgeContext};
use crate::config::EngineConfig;
use crate::cravings::{craving_stats, window};
use crate::progression::{streaks, Completion};
use crate::store::{CompletionOutcome, Store};
use crate::{
    CravingEntry, CravingStats, Error, ExerciseSession, NewCravingEntry, NewExerciseSession,
    NewUser, Result, StatsPatch, User, UserBadge, UserStats,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

/// Outcome of recording a craving entry
#[derive(Debug)]
pub struct CravingRecorded {
    /// The persisted log row
    pub entry: CravingEntry,
    /// Derived-state refresh, reported separately from the write
    pub refresh: Result<CravingRefresh>,
}

/// Derived state after a craving refresh
#[derive(Clone, Debug)]
pub struct CravingRefresh {
    pub craving: CravingStats,
    pub stats: UserStats,
    pub new_badges: Vec<UserBadge>,
}

/// Outcome of recording an exercise session
#[derive(Debug)]
pub struct SessionRecorded {
    /// The persisted log row
    pub session: ExerciseSession,
    /// `None` for sessions that were not completed
    pub progress: Option<Result<Progress>>,
}

/// Derived state after a completed session
#[derive(Clone, Debug)]
pub struct Progress {
    pub user: User,
    pub stats: UserStats,
    pub new_badges: Vec<UserBadge>,
    /// The session had already been applied; counters were left alone
    pub replayed: bool,
}

/// Progress and engagement engine over an injected store
#[derive(Clone)]
pub struct Engine<S> {
    store: S,
    config: EngineConfig,
}

impl<S: Store> Engine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a user; its stats row is created in the same step
    pub fn register_user(&self, new: NewUser) -> Result<User> {
        if let Some(email) = new.email.as_deref() {
            if email.trim().is_empty() {
                return Err(Error::ValidationFailed("email is empty".into()));
            }
        }
        let user = self.store.create_user(new)?;
        tracing::info!("Registered user {}", user.id);
        Ok(user)
    }

    // ------------------------------------------------------------------
    // Inbound events
    // ------------------------------------------------------------------

    /// Handle a "craving entry recorded" event
    pub fn record_craving(&self, new: NewCravingEntry) -> Result<CravingRecorded> {
        new.validate()?;
        let entry = self.store.create_craving_entry(new)?;
        tracing::debug!(
            "Recorded craving {} (intensity {}) for user {}",
            entry.id,
            entry.intensity,
            entry.user_id
        );

        let refresh = self.refresh_average_craving(entry.user_id);
        if let Err(e) = &refresh {
            tracing::warn!(
                "Craving {} stored but derived refresh failed: {}",
                entry.id,
                e
            );
        }

        Ok(CravingRecorded { entry, refresh })
    }

    /// Handle an "exercise session recorded" event
    pub fn record_session(&self, new: NewExerciseSession) -> Result<SessionRecorded> {
        new.validate()?;
        let session = self.store.create_exercise_session(new)?;
        tracing::debug!(
            "Recorded session {} ({}, completed: {}) for user {}",
            session.id,
            session.exercise_id,
            session.completed,
            session.user_id
        );

        let progress = if session.completed {
            let progress = self.complete_session(&session);
            if let Err(e) = &progress {
                tracing::warn!(
                    "Session {} stored but progression failed: {}",
                    session.id,
                    e
                );
            }
            Some(progress)
        } else {
            None
        };

        Ok(SessionRecorded { session, progress })
    }

    /// Apply progression for a completed, already-logged session.
    ///
    /// Safe to call again for the same session: counters and points are
    /// applied once, while streaks and badges are re-derived each time.
    pub fn complete_session(&self, session: &ExerciseSession) -> Result<Progress> {
        if !session.completed {
            return Err(Error::ValidationFailed(format!(
                "session {} is not completed",
                session.id
            )));
        }

        let previous_level = self.store.get_user(session.user_id)?.map(|u| u.level);

        let outcome = self.apply_with_retry(&Completion::for_session(session))?;
        let replayed = !outcome.was_applied();
        let (user, stats) = match outcome {
            CompletionOutcome::Applied { user, stats }
            | CompletionOutcome::AlreadyApplied { user, stats } => (user, stats),
        };

        if replayed {
            tracing::info!("Session {} already applied, skipping increment", session.id);
        } else if previous_level.is_some_and(|level| user.level > level) {
            tracing::info!("User {} reached level {}", user.id, user.level);
        }

        let now = Utc::now();
        let sessions = self.all_sessions(user.id)?;
        let stats = self.refresh_streaks(stats, &sessions, now)?;
        let new_badges = self.award_badges(user.id, &stats, &sessions, now)?;

        Ok(Progress {
            user,
            stats,
            new_badges,
            replayed,
        })
    }

    /// Recompute the cached craving average and re-check badges.
    ///
    /// The average is written as a plain patch outside the store's
    /// atomic step, so a concurrent refresh may land a slightly stale
    /// value last. It is always re-derivable through
    /// [`Engine::rebuild_stats`] or the next craving entry.
    pub fn refresh_average_craving(&self, user_id: Uuid) -> Result<CravingRefresh> {
        let now = Utc::now();
        let craving = self.craving_stats_at(user_id, self.config.craving_window_days, now)?;

        let stats = self.store.update_user_stats(
            user_id,
            &StatsPatch {
                average_craving: Some(craving.average),
                ..Default::default()
            },
        )?;

        let sessions = self.all_sessions(user_id)?;
        let new_badges = self.award_badges(user_id, &stats, &sessions, now)?;

        Ok(CravingRefresh {
            craving,
            stats,
            new_badges,
        })
    }

    /// Evaluate every badge rule and return the badges newly earned
    pub fn evaluate_badges(&self, user_id: Uuid) -> Result<Vec<UserBadge>> {
        self.evaluate_badges_at(user_id, Utc::now())
    }

    fn evaluate_badges_at(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<Vec<UserBadge>> {
        let stats = self.user_stats(user_id)?;
        let sessions = self.all_sessions(user_id)?;
        self.award_badges(user_id, &stats, &sessions, now)
    }

    /// Bring every derived field back in line with the event logs.
    ///
    /// Completed sessions whose increment never landed are applied first,
    /// so points catch up exactly once and a later replay of the same
    /// session is a no-op. The remaining fields are then recomputed from
    /// the logs and overwrite the stats row.
    pub fn rebuild_stats(&self, user_id: Uuid) -> Result<UserStats> {
        let current = self.user_stats(user_id)?;
        let now = Utc::now();
        let sessions = self.all_sessions(user_id)?;

        // Oldest first so level-ups are applied in log order
        let completed: Vec<_> = sessions.iter().rev().filter(|s| s.completed).collect();

        let mut caught_up = 0;
        for session in &completed {
            if self
                .apply_with_retry(&Completion::for_session(session))?
                .was_applied()
            {
                caught_up += 1;
            }
        }
        if caught_up > 0 {
            tracing::info!(
                "Applied {} missed completion(s) for user {}",
                caught_up,
                user_id
            );
        }

        let total_duration = completed
            .iter()
            .map(|s| u64::from(s.duration.unwrap_or(0)))
            .sum();
        let runs = streaks(completed.iter().copied(), now);
        let craving = self.craving_stats_at(user_id, self.config.craving_window_days, now)?;

        let patch = StatsPatch {
            exercises_completed: Some(completed.len() as u32),
            total_duration: Some(total_duration),
            current_streak: Some(runs.current),
            longest_streak: Some(runs.longest),
            average_craving: Some(craving.average),
        };

        let rebuilt = self.store.update_user_stats(user_id, &patch)?;
        if rebuilt.exercises_completed != current.exercises_completed
            || rebuilt.total_duration != current.total_duration
        {
            tracing::info!(
                "Rebuilt stats for user {}: {} -> {} exercises, {} -> {} seconds",
                user_id,
                current.exercises_completed,
                rebuilt.exercises_completed,
                current.total_duration,
                rebuilt.total_duration
            );
        }
        Ok(rebuilt)
    }

    // ------------------------------------------------------------------
    // Read accessors
    // ------------------------------------------------------------------

    pub fn user_stats(&self, user_id: Uuid) -> Result<UserStats> {
        self.store
            .get_user_stats(user_id)?
            .ok_or_else(|| Error::stats_not_found(user_id))
    }

    pub fn user_badges(&self, user_id: Uuid) -> Result<Vec<UserBadge>> {
        self.store.get_user_badges(user_id)
    }

    /// Craving average and trend over the last `days`.
    ///
    /// A lookback reaching past the representable date range covers the
    /// whole log.
    pub fn craving_stats(&self, user_id: Uuid, days: i64) -> Result<CravingStats> {
        if days <= 0 {
            return Err(Error::ValidationFailed(format!(
                "craving lookback must be positive, got {} days",
                days
            )));
        }
        self.craving_stats_at(user_id, days, Utc::now())
    }

    pub fn recent_cravings(&self, user_id: Uuid) -> Result<Vec<CravingEntry>> {
        self.store
            .get_craving_entries(user_id, self.config.history_limit)
    }

    pub fn recent_sessions(&self, user_id: Uuid) -> Result<Vec<ExerciseSession>> {
        self.store
            .get_exercise_sessions(user_id, self.config.history_limit)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn apply_with_retry(&self, completion: &Completion) -> Result<CompletionOutcome> {
        match self.store.apply_completion(completion) {
            Err(e) if e.is_retryable() => {
                tracing::warn!(
                    "Retrying completion of session {} after conflict: {}",
                    completion.session_id,
                    e
                );
                self.store.apply_completion(completion)
            }
            other => other,
        }
    }

    fn all_sessions(&self, user_id: Uuid) -> Result<Vec<ExerciseSession>> {
        self.store.get_exercise_sessions(user_id, usize::MAX)
    }

    fn craving_stats_at(
        &self,
        user_id: Uuid,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<CravingStats> {
        let mut entries = self.store.get_craving_entries(user_id, usize::MAX)?;
        // Oldest first, keeping insertion order for equal timestamps
        entries.reverse();
        Ok(craving_stats(window(&entries, now, days)))
    }

    /// Patch streaks derived from the session log.
    ///
    /// Like the cached average this is read-then-write outside the
    /// store's atomic step; a racing writer can leave a stale streak
    /// until the next completion or rebuild.
    fn refresh_streaks(
        &self,
        stats: UserStats,
        sessions: &[ExerciseSession],
        now: DateTime<Utc>,
    ) -> Result<UserStats> {
        let derived = streaks(sessions, now);
        let longest = derived.longest.max(stats.longest_streak);
        if derived.current == stats.current_streak && longest == stats.longest_streak {
            return Ok(stats);
        }

        self.store.update_user_stats(
            stats.user_id,
            &StatsPatch {
                current_streak: Some(derived.current),
                longest_streak: Some(longest),
                ..Default::default()
            },
        )
    }

    fn award_badges(
        &self,
        user_id: Uuid,
        stats: &UserStats,
        sessions: &[ExerciseSession],
        now: DateTime<Utc>,
    ) -> Result<Vec<UserBadge>> {
        let craving = self.craving_stats_at(user_id, self.config.craving_window_days, now)?;
        let ctx = BadgeContext {
            now,
            stats,
            sessions,
            craving,
        };

        let qualifying = qualifying_badges(&ctx);
        if qualifying.is_empty() {
            return Ok(Vec::new());
        }

        let held: HashSet<Uuid> = self
            .store
            .get_user_badges(user_id)?
            .into_iter()
            .map(|b| b.id)
            .collect();

        let mut new_badges = Vec::new();
        for badge_type in qualifying {
            let badge = self.store.award_badge(user_id, badge_type)?;
            if !held.contains(&badge.id) {
                tracing::info!("User {} earned badge {}", user_id, badge_type);
                new_badges.push(badge);
            }
        }
        Ok(new_badges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::POINTS_PER_SESSION;
    use crate::progression::level_for_points;
    use crate::store::{FileStore, MemoryStore};
    use crate::BadgeType;
    use chrono::Duration;
    use std::sync::Arc;
    use std::thread;

    fn engine_with_user() -> (Engine<MemoryStore>, User) {
        crate::logging::init_test();
        let engine = Engine::new(MemoryStore::new(), EngineConfig::default());
        let user = engine.register_user(NewUser::default()).unwrap();
        (engine, user)
    }

    fn completed(user_id: Uuid, duration: u32) -> NewExerciseSession {
        NewExerciseSession {
            user_id,
            exercise_id: "ex-1".into(),
            duration: Some(duration),
            completed: true,
            ..Default::default()
        }
    }

    fn craving(user_id: Uuid, intensity: u8, hours_ago: i64) -> NewCravingEntry {
        NewCravingEntry {
            user_id,
            intensity,
            created_at: Some(Utc::now() - Duration::hours(hours_ago)),
            ..Default::default()
        }
    }

    #[test]
    fn test_completed_session_progresses_user() {
        let (engine, user) = engine_with_user();

        let recorded = engine.record_session(completed(user.id, 300)).unwrap();
        let progress = recorded.progress.unwrap().unwrap();

        assert!(!progress.replayed);
        assert_eq!(progress.user.points, POINTS_PER_SESSION);
        assert_eq!(progress.stats.exercises_completed, 1);
        assert_eq!(progress.stats.total_duration, 300);
        assert_eq!(progress.stats.current_streak, 1);
        assert_eq!(progress.stats.longest_streak, 1);
    }

    #[test]
    fn test_incomplete_session_has_no_side_effects() {
        let (engine, user) = engine_with_user();
        let mut new = completed(user.id, 300);
        new.completed = false;

        let recorded = engine.record_session(new).unwrap();
        assert!(recorded.progress.is_none());
        assert_eq!(engine.user_stats(user.id).unwrap().exercises_completed, 0);
        assert_eq!(engine.recent_sessions(user.id).unwrap().len(), 1);
    }

    #[test]
    fn test_replay_does_not_double_award() {
        let (engine, user) = engine_with_user();
        let recorded = engine.record_session(completed(user.id, 60)).unwrap();

        let replay = engine.complete_session(&recorded.session).unwrap();
        assert!(replay.replayed);
        assert_eq!(replay.user.points, POINTS_PER_SESSION);
        assert_eq!(replay.stats.exercises_completed, 1);
    }

    #[test]
    fn test_complete_session_rejects_incomplete() {
        let (engine, user) = engine_with_user();
        let mut new = completed(user.id, 60);
        new.completed = false;
        let recorded = engine.record_session(new).unwrap();

        let result = engine.complete_session(&recorded.session);
        assert!(matches!(result, Err(Error::ValidationFailed(_))));
    }

    #[test]
    fn test_invalid_craving_never_reaches_log() {
        let (engine, user) = engine_with_user();
        let result = engine.record_craving(craving(user.id, 11, 0));
        assert!(matches!(result, Err(Error::ValidationFailed(_))));
        assert!(engine.recent_cravings(user.id).unwrap().is_empty());
    }

    #[test]
    fn test_craving_refreshes_cached_average() {
        let (engine, user) = engine_with_user();
        engine.record_craving(craving(user.id, 6, 3)).unwrap();
        let recorded = engine.record_craving(craving(user.id, 3, 1)).unwrap();

        let refresh = recorded.refresh.unwrap();
        assert_eq!(refresh.craving.average, 4.5);
        assert_eq!(refresh.stats.average_craving, 4.5);
        assert_eq!(engine.user_stats(user.id).unwrap().average_craving, 4.5);
    }

    #[test]
    fn test_craving_reduction_awarded_from_craving_event() {
        let (engine, user) = engine_with_user();
        let mut earned = Vec::new();
        let mut last = CravingStats::default();
        for (i, intensity) in [8, 8, 8, 2, 2, 2].into_iter().enumerate() {
            let refresh = engine
                .record_craving(craving(user.id, intensity, 10 - i as i64))
                .unwrap()
                .refresh
                .unwrap();
            earned.extend(refresh.new_badges);
            last = refresh.craving;
        }

        assert_eq!(last.trend, -75.0);
        assert_eq!(last.average, 5.0);
        assert_eq!(earned.len(), 1);
        assert_eq!(earned[0].badge_type, BadgeType::CravingReduction);
    }

    #[test]
    fn test_badge_reported_new_only_once() {
        let (engine, user) = engine_with_user();
        engine.record_craving(craving(user.id, 9, 5)).unwrap();
        let first = engine.record_craving(craving(user.id, 1, 1)).unwrap();
        assert_eq!(first.refresh.unwrap().new_badges.len(), 1);

        let second = engine.record_craving(craving(user.id, 1, 0)).unwrap();
        assert!(second.refresh.unwrap().new_badges.is_empty());
        assert_eq!(engine.user_badges(user.id).unwrap().len(), 1);
    }

    #[test]
    fn test_rebuild_restores_stats_from_log() {
        let (engine, user) = engine_with_user();
        engine.record_session(completed(user.id, 100)).unwrap();
        engine.record_session(completed(user.id, 200)).unwrap();
        engine.record_craving(craving(user.id, 4, 2)).unwrap();

        engine
            .store()
            .update_user_stats(
                user.id,
                &StatsPatch {
                    exercises_completed: Some(0),
                    total_duration: Some(0),
                    average_craving: Some(9.0),
                    ..Default::default()
                },
            )
            .unwrap();

        let rebuilt = engine.rebuild_stats(user.id).unwrap();
        assert_eq!(rebuilt.exercises_completed, 2);
        assert_eq!(rebuilt.total_duration, 300);
        assert_eq!(rebuilt.average_craving, 4.0);
        assert_eq!(rebuilt.current_streak, 1);
    }

    #[test]
    fn test_unknown_user_is_not_found() {
        let (engine, _) = engine_with_user();
        let result = engine.record_session(completed(Uuid::new_v4(), 60));
        assert!(matches!(result, Err(Error::NotFound { .. })));
        assert!(matches!(
            engine.user_stats(Uuid::new_v4()),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_weekly_badge_needs_seven_sessions() {
        let (engine, user) = engine_with_user();
        let mut earned = Vec::new();
        for _ in 0..7 {
            let progress = engine
                .record_session(completed(user.id, 60))
                .unwrap()
                .progress
                .unwrap()
                .unwrap();
            earned.push(progress.new_badges);
        }

        assert!(earned[..6].iter().all(|b| b.is_empty()));
        assert_eq!(earned[6].len(), 1);
        assert_eq!(earned[6][0].badge_type, BadgeType::SevenDays);
    }

    #[test]
    fn test_badges_are_never_revoked() {
        let (engine, user) = engine_with_user();
        engine.record_craving(craving(user.id, 9, 5)).unwrap();
        engine.record_craving(craving(user.id, 1, 4)).unwrap();
        assert_eq!(engine.user_badges(user.id).unwrap().len(), 1);

        // Trend turns upward again
        for hours_ago in [3, 2, 1] {
            engine.record_craving(craving(user.id, 10, hours_ago)).unwrap();
        }
        assert!(engine.craving_stats(user.id, 30).unwrap().trend > -20.0);

        let badges = engine.user_badges(user.id).unwrap();
        assert_eq!(badges.len(), 1);
        assert_eq!(badges[0].badge_type, BadgeType::CravingReduction);
    }

    #[test]
    fn test_concurrent_completions_on_shared_memory_store() {
        crate::logging::init_test();
        let engine = Engine::new(Arc::new(MemoryStore::new()), EngineConfig::default());
        let user = engine.register_user(NewUser::default()).unwrap();

        run_concurrent_sessions(&engine, user.id, 8, 5);

        let stats = engine.user_stats(user.id).unwrap();
        let user = engine.store().get_user(user.id).unwrap().unwrap();
        assert_eq!(stats.exercises_completed, 40);
        assert_eq!(stats.total_duration, 40 * 30);
        assert_eq!(user.points, 40 * POINTS_PER_SESSION);
        assert_eq!(user.level, level_for_points(user.points));
    }

    #[test]
    fn test_concurrent_completions_on_file_store() {
        crate::logging::init_test();
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let engine = Engine::new(Arc::new(store), EngineConfig::default());
        let user = engine.register_user(NewUser::default()).unwrap();

        run_concurrent_sessions(&engine, user.id, 4, 3);

        // A fresh handle sees the same totals
        let reopened = Engine::new(FileStore::open(dir.path()).unwrap(), EngineConfig::default());
        let stats = reopened.user_stats(user.id).unwrap();
        let user = reopened.store().get_user(user.id).unwrap().unwrap();
        assert_eq!(stats.exercises_completed, 12);
        assert_eq!(user.points, 12 * POINTS_PER_SESSION);
        assert_eq!(reopened.recent_sessions(user.id).unwrap().len(), 12);
    }

    fn run_concurrent_sessions<S: Store + Clone + 'static>(
        engine: &Engine<S>,
        user_id: Uuid,
        threads: usize,
        per_thread: usize,
    ) {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let engine = engine.clone();
                thread::spawn(move || {
                    for _ in 0..per_thread {
                        let recorded = engine.record_session(completed(user_id, 30)).unwrap();
                        recorded.progress.unwrap().unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_rebuild_then_replay_counts_session_once() {
        let (engine, user) = engine_with_user();
        // Logged, but the progression step never ran
        let session = engine
            .store()
            .create_exercise_session(completed(user.id, 120))
            .unwrap();

        let rebuilt = engine.rebuild_stats(user.id).unwrap();
        assert_eq!(rebuilt.exercises_completed, 1);
        assert_eq!(rebuilt.total_duration, 120);
        let points = engine.store().get_user(user.id).unwrap().unwrap().points;
        assert_eq!(points, POINTS_PER_SESSION);

        let replay = engine.complete_session(&session).unwrap();
        assert!(replay.replayed);
        assert_eq!(replay.user.points, POINTS_PER_SESSION);
        assert_eq!(replay.stats.exercises_completed, 1);
        assert_eq!(replay.stats.total_duration, 120);
    }

    #[test]
    fn test_rebuild_is_stable_when_repeated() {
        let (engine, user) = engine_with_user();
        engine
            .store()
            .create_exercise_session(completed(user.id, 60))
            .unwrap();
        engine.record_session(completed(user.id, 60)).unwrap();

        let first = engine.rebuild_stats(user.id).unwrap();
        let second = engine.rebuild_stats(user.id).unwrap();
        assert_eq!(first.exercises_completed, 2);
        assert_eq!(second.exercises_completed, 2);
        let user = engine.store().get_user(user.id).unwrap().unwrap();
        assert_eq!(user.points, 2 * POINTS_PER_SESSION);
    }

    #[test]
    fn test_craving_stats_lookback_bounds() {
        let (engine, user) = engine_with_user();
        engine.record_craving(craving(user.id, 6, 2)).unwrap();

        let all = engine.craving_stats(user.id, 100_000_000).unwrap();
        assert_eq!(all.average, 6.0);
        assert_eq!(engine.craving_stats(user.id, i64::MAX).unwrap().average, 6.0);

        for days in [0, -5] {
            assert!(matches!(
                engine.craving_stats(user.id, days),
                Err(Error::ValidationFailed(_))
            ));
        }
    }

    #[test]
    fn test_weekly_badge_survives_a_quiet_week() {
        let (engine, user) = engine_with_user();
        let start = Utc::now() - Duration::days(20);
        let dated = |at: DateTime<Utc>| NewExerciseSession {
            created_at: Some(at),
            ..completed(user.id, 60)
        };

        for hour in 0..7 {
            engine
                .record_session(dated(start + Duration::hours(hour)))
                .unwrap();
        }
        let earned = engine
            .evaluate_badges_at(user.id, start + Duration::days(1))
            .unwrap();
        assert_eq!(earned.len(), 1);
        assert_eq!(earned[0].badge_type, BadgeType::SevenDays);

        // Only two sessions in a later week
        for day in [8, 9] {
            engine.record_session(dated(start + Duration::days(day))).unwrap();
        }
        let later = engine
            .evaluate_badges_at(user.id, start + Duration::days(10))
            .unwrap();
        assert!(later.is_empty());

        let badges = engine.user_badges(user.id).unwrap();
        assert_eq!(badges.len(), 1);
        assert_eq!(badges[0].badge_type, BadgeType::SevenDays);
    }

    #[test]
    fn test_two_thresholds_crossed_in_one_event() {
        let (engine, user) = engine_with_user();
        for _ in 0..49 {
            engine.record_session(completed(user.id, 30)).unwrap();
        }
        // Written straight to the log so no refresh evaluates them yet
        for (intensity, hours_ago) in [(9, 3), (1, 2)] {
            engine
                .store()
                .create_craving_entry(craving(user.id, intensity, hours_ago))
                .unwrap();
        }

        let progress = engine
            .record_session(completed(user.id, 30))
            .unwrap()
            .progress
            .unwrap()
            .unwrap();

        let mut earned: Vec<_> = progress.new_badges.iter().map(|b| b.badge_type).collect();
        earned.sort();
        assert_eq!(
            earned,
            vec![BadgeType::FiftyExercises, BadgeType::CravingReduction]
        );
    }
}
