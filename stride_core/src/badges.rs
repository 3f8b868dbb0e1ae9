//! Badge rules.
//!
//! Each rule is a predicate over a snapshot of the user's derived state.
//! Rules never look at each other's outcome and never look at which
//! badges are already held: awarding is idempotent at the store, and
//! badges are never revoked.

use crate::{BadgeType, CravingStats, ExerciseSession, UserStats};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

/// Completed sessions needed inside the trailing week for `7_days`
pub const WEEKLY_SESSIONS_REQUIRED: usize = 7;

/// Lifetime completed sessions needed for `50_exercises`
pub const EXERCISES_REQUIRED: u32 = 50;

/// Craving trend (percent) at or below which `craving_reduction` is earned
pub const CRAVING_REDUCTION_TREND: f64 = -20.0;

/// Everything the rules need to see, captured once per evaluation pass
#[derive(Clone, Debug)]
pub struct BadgeContext<'a> {
    pub now: DateTime<Utc>,
    pub stats: &'a UserStats,
    /// Recent session log, any order
    pub sessions: &'a [ExerciseSession],
    pub craving: CravingStats,
}

impl BadgeType {
    /// Whether this badge's condition holds for the given snapshot
    pub fn is_earned(&self, ctx: &BadgeContext<'_>) -> bool {
        match self {
            BadgeType::SevenDays => completed_in_last_week(ctx) >= WEEKLY_SESSIONS_REQUIRED,
            BadgeType::FiftyExercises => ctx.stats.exercises_completed >= EXERCISES_REQUIRED,
            BadgeType::CravingReduction => ctx.craving.trend <= CRAVING_REDUCTION_TREND,
        }
    }
}

fn completed_in_last_week(ctx: &BadgeContext<'_>) -> usize {
    let cutoff = ctx.now - Duration::days(7);
    ctx.sessions
        .iter()
        .filter(|s| s.completed && s.created_at > cutoff)
        .map(|s| s.id)
        .collect::<HashSet<_>>()
        .len()
}

/// Evaluate every rule and return the badges whose condition holds
pub fn qualifying_badges(ctx: &BadgeContext<'_>) -> Vec<BadgeType> {
    BadgeType::ALL
        .into_iter()
        .filter(|badge| badge.is_earned(ctx))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn session(now: DateTime<Utc>, days_ago: i64, completed: bool) -> ExerciseSession {
        ExerciseSession {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            exercise_id: "ex-1".into(),
            duration: Some(60),
            completed,
            craving_before: None,
            craving_after: None,
            created_at: now - Duration::days(days_ago) - Duration::minutes(1),
        }
    }

    fn stats(completed: u32) -> UserStats {
        let mut stats = UserStats::zeroed(Uuid::nil(), Utc::now());
        stats.exercises_completed = completed;
        stats
    }

    #[test]
    fn test_no_badges_for_fresh_user() {
        let stats = stats(0);
        let ctx = BadgeContext {
            now: Utc::now(),
            stats: &stats,
            sessions: &[],
            craving: CravingStats::default(),
        };
        assert!(qualifying_badges(&ctx).is_empty());
    }

    #[test]
    fn test_seven_sessions_in_week() {
        let now = Utc::now();
        let stats = stats(7);
        let sessions: Vec<_> = (0..7).map(|d| session(now, d % 6, true)).collect();
        let ctx = BadgeContext {
            now,
            stats: &stats,
            sessions: &sessions,
            craving: CravingStats::default(),
        };
        assert_eq!(qualifying_badges(&ctx), vec![BadgeType::SevenDays]);
    }

    #[test]
    fn test_old_or_incomplete_sessions_do_not_count() {
        let now = Utc::now();
        let stats = stats(7);
        let mut sessions: Vec<_> = (0..6).map(|d| session(now, d, true)).collect();
        sessions.push(session(now, 8, true));
        sessions.push(session(now, 0, false));
        let ctx = BadgeContext {
            now,
            stats: &stats,
            sessions: &sessions,
            craving: CravingStats::default(),
        };
        assert!(!BadgeType::SevenDays.is_earned(&ctx));
    }

    #[test]
    fn test_duplicate_session_rows_counted_once() {
        let now = Utc::now();
        let stats = stats(7);
        let one = session(now, 0, true);
        let sessions = vec![one; 7];
        let ctx = BadgeContext {
            now,
            stats: &stats,
            sessions: &sessions,
            craving: CravingStats::default(),
        };
        assert!(!BadgeType::SevenDays.is_earned(&ctx));
    }

    #[test]
    fn test_craving_reduction_threshold_is_inclusive() {
        let stats = stats(0);
        let mut ctx = BadgeContext {
            now: Utc::now(),
            stats: &stats,
            sessions: &[],
            craving: CravingStats {
                average: 4.0,
                trend: -20.0,
            },
        };
        assert!(BadgeType::CravingReduction.is_earned(&ctx));

        ctx.craving.trend = -19.0;
        assert!(!BadgeType::CravingReduction.is_earned(&ctx));
    }

    #[test]
    fn test_rules_are_independent() {
        let stats = stats(50);
        let ctx = BadgeContext {
            now: Utc::now(),
            stats: &stats,
            sessions: &[],
            craving: CravingStats {
                average: 3.0,
                trend: -40.0,
            },
        };
        assert_eq!(
            qualifying_badges(&ctx),
            vec![BadgeType::FiftyExercises, BadgeType::CravingReduction]
        );
    }
}
