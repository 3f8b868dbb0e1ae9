//! Progression rules: points, levels and streaks.
//!
//! - Every completed session is worth a fixed number of points
//! - Levels are 100-point bands, always re-derived from points
//! - Streaks count consecutive UTC days with a completed session

use crate::ExerciseSession;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Points granted per completed session
pub const POINTS_PER_SESSION: u32 = 10;

/// Width of a level band, in points
pub const POINTS_PER_LEVEL: u32 = 100;

/// Level for a point total: `floor(points / 100) + 1`
pub fn level_for_points(points: u32) -> u32 {
    points / POINTS_PER_LEVEL + 1
}

/// Counter increments for one completed session.
///
/// Stores apply this as a single atomic unit keyed by `session_id`, so
/// replaying the same session never grants points twice.
#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub duration: u64,
    pub points: u32,
}

impl Completion {
    pub fn for_session(session: &ExerciseSession) -> Self {
        Self {
            session_id: session.id,
            user_id: session.user_id,
            duration: u64::from(session.duration.unwrap_or(0)),
            points: POINTS_PER_SESSION,
        }
    }
}

/// Current and longest run of consecutive days with a completed session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Streaks {
    pub current: u32,
    pub longest: u32,
}

/// Derive streaks from a session log.
///
/// Only completed sessions count. The current streak survives until the
/// end of the day after the last active day, so a user who trained
/// yesterday but not yet today keeps their streak.
pub fn streaks<'a, I>(sessions: I, now: DateTime<Utc>) -> Streaks
where
    I: IntoIterator<Item = &'a ExerciseSession>,
{
    let days: BTreeSet<NaiveDate> = sessions
        .into_iter()
        .filter(|s| s.completed)
        .map(|s| s.created_at.date_naive())
        .collect();

    let mut longest = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;
    for &day in &days {
        run = match prev {
            Some(p) if p + Duration::days(1) == day => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(day);
    }

    let today = now.date_naive();
    let current = match prev {
        Some(last) if last == today || last + Duration::days(1) == today => run,
        _ => 0,
    };

    Streaks { current, longest }
}
