//! Built-in catalog of guided exercises.
//!
//! Sessions reference exercises by id. The engine itself does not care
//! which exercise was done; the catalog lets drivers reject typos and
//! show users what is available.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What an exercise is meant to help with
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseCategory {
    CravingReduction,
    EnergyBoost,
    EmotionManagement,
    Cardio,
    Mindfulness,
    Flexibility,
    Strength,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

/// A guided exercise definition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: ExerciseCategory,
    pub difficulty: Difficulty,
    pub suggested_minutes: u32,
    pub instructions: Vec<String>,
}

/// Exercises keyed by id, iterated in id order
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub exercises: BTreeMap<String, Exercise>,
}

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

impl Catalog {
    pub fn get(&self, id: &str) -> Option<&Exercise> {
        self.exercises.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.exercises.contains_key(id)
    }

    fn insert(&mut self, exercise: Exercise) {
        self.exercises.insert(exercise.id.clone(), exercise);
    }

    /// Check internal consistency, returning one message per problem
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (id, exercise) in &self.exercises {
            if id.is_empty() || exercise.id.is_empty() {
                errors.push("Exercise has empty ID".to_string());
            }
            if id != &exercise.id {
                errors.push(format!(
                    "Exercise key '{}' doesn't match exercise.id '{}'",
                    id, exercise.id
                ));
            }
            if exercise.title.is_empty() {
                errors.push(format!("Exercise '{}' has empty title", id));
            }
            if exercise.suggested_minutes == 0 {
                errors.push(format!("Exercise '{}' has zero duration", id));
            }
            if exercise.instructions.is_empty() {
                errors.push(format!("Exercise '{}' has no instructions", id));
            }
        }

        errors
    }
}

fn exercise(
    id: &str,
    title: &str,
    description: &str,
    category: ExerciseCategory,
    difficulty: Difficulty,
    suggested_minutes: u32,
    instructions: &[&str],
) -> Exercise {
    Exercise {
        id: id.into(),
        title: title.into(),
        description: description.into(),
        category,
        difficulty,
        suggested_minutes,
        instructions: instructions.iter().map(|s| s.to_string()).collect(),
    }
}

/// Build the default catalog from scratch
pub fn build_default_catalog() -> Catalog {
    use Difficulty::*;
    use ExerciseCategory::*;

    let mut catalog = Catalog::default();

    catalog.insert(exercise(
        "ex-1",
        "Deep Breathing",
        "Breathing technique to lower stress and ride out a craving",
        CravingReduction,
        Beginner,
        5,
        &[
            "Sit comfortably",
            "Breathe in slowly through the nose for 4 seconds",
            "Hold for 4 seconds",
            "Breathe out through the mouth for 6 seconds",
            "Repeat 10 times",
        ],
    ));

    catalog.insert(exercise(
        "ex-2",
        "Brisk Walk",
        "Cardio session to release endorphins",
        EnergyBoost,
        Intermediate,
        20,
        &[
            "Find a safe place to walk",
            "Start at a moderate pace",
            "Speed up gradually",
            "Hold a sustained pace",
            "Finish with a cool-down",
        ],
    ));

    catalog.insert(exercise(
        "ex-3",
        "Guided Meditation",
        "Meditation session for managing emotions",
        EmotionManagement,
        Beginner,
        15,
        &[
            "Settle somewhere quiet",
            "Close your eyes or rest your gaze on one point",
            "Focus on your breathing",
            "Notice thoughts without judging them",
            "Return to the breath whenever the mind wanders",
        ],
    ));

    catalog.insert(exercise(
        "morning-stretch",
        "Morning Stretches",
        "Gentle stretching sequence to start the day",
        Flexibility,
        Beginner,
        15,
        &[
            "Move slowly into each stretch",
            "Hold each position for 30 seconds",
            "Cover arms, neck, back and legs",
            "Breathe deeply throughout",
        ],
    ));

    catalog.insert(exercise(
        "light-jog",
        "Light Jog",
        "Moderate-pace run to lift mood",
        Cardio,
        Intermediate,
        30,
        &[
            "Warm up with 5 minutes of walking",
            "Jog at a pace that still lets you talk",
            "Cool down with 5 minutes of walking",
        ],
    ));

    catalog.insert(exercise(
        "box-breathing",
        "Box Breathing",
        "Paced breathing to calm the nervous system",
        Mindfulness,
        Beginner,
        10,
        &[
            "Breathe in for 4 seconds",
            "Hold for 4 seconds",
            "Breathe out for 4 seconds",
            "Hold for 4 seconds",
            "Repeat for the whole session",
        ],
    ));

    catalog.insert(exercise(
        "gentle-yoga",
        "Gentle Yoga",
        "Slow flow to release tension",
        Flexibility,
        Beginner,
        25,
        &[
            "Start in a comfortable seated position",
            "Move through each pose with the breath",
            "Skip any pose that causes pain",
            "Finish lying down for 2 minutes",
        ],
    ));

    catalog.insert(exercise(
        "bodyweight-squats",
        "Bodyweight Squats",
        "Short strength set that needs no equipment",
        Strength,
        Intermediate,
        12,
        &[
            "Stand with feet shoulder-width apart",
            "Lower until thighs are parallel to the floor",
            "Push back up through the heels",
            "Do 3 sets of 10 with a minute of rest",
        ],
    ));

    catalog
}
