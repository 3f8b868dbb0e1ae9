//! Core domain types for the Stride engagement engine.
//!
//! This module defines the entities the engine reads and maintains:
//! - Users and their progression fields
//! - The append-only event log (craving entries, exercise sessions)
//! - Derived per-user statistics and the patch used to update them
//! - Badges

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Highest intensity on the 0-10 craving scale
pub const MAX_INTENSITY: u8 = 10;

// ============================================================================
// Users
// ============================================================================

/// A registered user with progression fields
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub points: u32,
    pub level: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration data for a new user
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

// ============================================================================
// Event log
// ============================================================================

/// A recorded craving, immutable once written
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CravingEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub intensity: u8,
    #[serde(default)]
    pub triggers: BTreeSet<String>,
    #[serde(default)]
    pub emotions: BTreeSet<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// "Craving entry recorded" event payload
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewCravingEntry {
    pub user_id: Uuid,
    pub intensity: u8,
    #[serde(default)]
    pub triggers: BTreeSet<String>,
    #[serde(default)]
    pub emotions: BTreeSet<String>,
    pub notes: Option<String>,
    /// Defaults to the time of recording
    pub created_at: Option<DateTime<Utc>>,
}

impl NewCravingEntry {
    pub fn validate(&self) -> Result<()> {
        check_intensity("intensity", self.intensity)
    }
}

/// A recorded exercise session, immutable once written
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub exercise_id: String,
    /// Seconds spent; absent counts as zero
    pub duration: Option<u32>,
    pub completed: bool,
    pub craving_before: Option<u8>,
    pub craving_after: Option<u8>,
    pub created_at: DateTime<Utc>,
}

/// "Exercise session recorded" event payload
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewExerciseSession {
    pub user_id: Uuid,
    pub exercise_id: String,
    pub duration: Option<u32>,
    pub completed: bool,
    pub craving_before: Option<u8>,
    pub craving_after: Option<u8>,
    /// Defaults to the time of recording
    pub created_at: Option<DateTime<Utc>>,
}

impl NewExerciseSession {
    pub fn validate(&self) -> Result<()> {
        if self.exercise_id.trim().is_empty() {
            return Err(Error::ValidationFailed("exercise id is empty".into()));
        }
        if let Some(before) = self.craving_before {
            check_intensity("craving_before", before)?;
        }
        if let Some(after) = self.craving_after {
            check_intensity("craving_after", after)?;
        }
        Ok(())
    }
}

fn check_intensity(field: &str, value: u8) -> Result<()> {
    if value > MAX_INTENSITY {
        return Err(Error::ValidationFailed(format!(
            "{} must be within 0..={}, got {}",
            field, MAX_INTENSITY, value
        )));
    }
    Ok(())
}

// ============================================================================
// Derived statistics
// ============================================================================

/// Per-user aggregate maintained by the engine.
///
/// Every field is re-derivable from the event log; `average_craving` in
/// particular is a cache of [`crate::cravings::craving_stats`] over the
/// default window and may be rebuilt at any time.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserStats {
    pub user_id: Uuid,
    pub exercises_completed: u32,
    /// Seconds
    pub total_duration: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub average_craving: f64,
    pub updated_at: DateTime<Utc>,
}

impl UserStats {
    /// Zero-valued stats row created alongside a new user
    pub fn zeroed(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            exercises_completed: 0,
            total_duration: 0,
            current_streak: 0,
            longest_streak: 0,
            average_craving: 0.0,
            updated_at: now,
        }
    }

    /// Apply a patch, replacing only the supplied fields
    pub fn merged(&self, patch: &StatsPatch, now: DateTime<Utc>) -> Self {
        Self {
            user_id: self.user_id,
            exercises_completed: patch
                .exercises_completed
                .unwrap_or(self.exercises_completed),
            total_duration: patch.total_duration.unwrap_or(self.total_duration),
            current_streak: patch.current_streak.unwrap_or(self.current_streak),
            longest_streak: patch.longest_streak.unwrap_or(self.longest_streak),
            average_craving: patch.average_craving.unwrap_or(self.average_craving),
            updated_at: now,
        }
    }
}

/// Partial update for [`UserStats`]; `None` leaves a field untouched
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsPatch {
    pub exercises_completed: Option<u32>,
    pub total_duration: Option<u64>,
    pub current_streak: Option<u32>,
    pub longest_streak: Option<u32>,
    pub average_craving: Option<f64>,
}

/// Windowed craving summary. A negative trend means cravings are easing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CravingStats {
    pub average: f64,
    pub trend: f64,
}

// ============================================================================
// Badges
// ============================================================================

/// Achievement a user can earn once
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BadgeType {
    #[serde(rename = "7_days")]
    SevenDays,
    #[serde(rename = "50_exercises")]
    FiftyExercises,
    #[serde(rename = "craving_reduction")]
    CravingReduction,
}

impl BadgeType {
    pub const ALL: [BadgeType; 3] = [
        BadgeType::SevenDays,
        BadgeType::FiftyExercises,
        BadgeType::CravingReduction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeType::SevenDays => "7_days",
            BadgeType::FiftyExercises => "50_exercises",
            BadgeType::CravingReduction => "craving_reduction",
        }
    }
}

impl fmt::Display for BadgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BadgeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        BadgeType::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| Error::ValidationFailed(format!("unknown badge type: {}", s)))
    }
}

/// An earned badge; at most one per `(user_id, badge_type)`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserBadge {
    pub id: Uuid,
    pub user_id: Uuid,
    pub badge_type: BadgeType,
    pub earned_at: DateTime<Utc>,
}
