use clap::{Parser, Subcommand};
use serde_json::json;
use std::collections::BTreeSet;
use std::path::PathBuf;
use stride_core::*;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "stride")]
#[command(about = "Craving and exercise progress tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Record a craving
    Craving {
        #[arg(long)]
        user: Uuid,

        /// Intensity from 0 to 10
        #[arg(long)]
        intensity: u8,

        #[arg(long = "trigger")]
        triggers: Vec<String>,

        #[arg(long = "emotion")]
        emotions: Vec<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Record an exercise session
    Session {
        #[arg(long)]
        user: Uuid,

        /// Exercise id from the catalog
        #[arg(long)]
        exercise: String,

        /// Duration in seconds
        #[arg(long)]
        duration: Option<u32>,

        #[arg(long)]
        completed: bool,

        /// Craving intensity before the exercise
        #[arg(long)]
        before: Option<u8>,

        /// Craving intensity after the exercise
        #[arg(long)]
        after: Option<u8>,
    },

    /// Show stats, craving trend and badges as JSON
    Stats {
        #[arg(long)]
        user: Uuid,

        /// Craving lookback in days (defaults to the configured window)
        #[arg(long)]
        days: Option<i64>,
    },

    /// Recompute derived stats from the event logs
    Rebuild {
        #[arg(long)]
        user: Uuid,
    },

    /// List available exercises
    Exercises,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Register a user and print its id
    Create {
        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,
    },
}

fn main() -> Result<()> {
    stride_core::logging::init_with_level("warn");

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| config.data.data_dir.clone());

    let store = FileStore::with_config(&data_dir, &config.store)?;
    tracing::debug!("Using data directory {:?}", store.root());
    let engine = Engine::new(store, config.engine.clone());

    match cli.command {
        Commands::User {
            command:
                UserCommands::Create {
                    email,
                    first_name,
                    last_name,
                },
        } => cmd_user_create(&engine, email, first_name, last_name),
        Commands::Craving {
            user,
            intensity,
            triggers,
            emotions,
            notes,
        } => {
            let new = NewCravingEntry {
                user_id: user,
                intensity,
                triggers: triggers.into_iter().collect::<BTreeSet<_>>(),
                emotions: emotions.into_iter().collect::<BTreeSet<_>>(),
                notes,
                created_at: None,
            };
            cmd_craving(&engine, new)
        }
        Commands::Session {
            user,
            exercise,
            duration,
            completed,
            before,
            after,
        } => {
            let new = NewExerciseSession {
                user_id: user,
                exercise_id: exercise,
                duration,
                completed,
                craving_before: before,
                craving_after: after,
                created_at: None,
            };
            cmd_session(&engine, new)
        }
        Commands::Stats { user, days } => cmd_stats(&engine, user, days),
        Commands::Rebuild { user } => cmd_rebuild(&engine, user),
        Commands::Exercises => cmd_exercises(),
    }
}

fn cmd_user_create(
    engine: &Engine<FileStore>,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
) -> Result<()> {
    let user = engine.register_user(NewUser {
        email,
        first_name,
        last_name,
    })?;
    println!("{}", user.id);
    Ok(())
}

fn cmd_craving(engine: &Engine<FileStore>, new: NewCravingEntry) -> Result<()> {
    let recorded = engine.record_craving(new)?;
    println!("✓ Craving logged ({}/10)", recorded.entry.intensity);

    match recorded.refresh {
        Ok(refresh) => {
            println!(
                "  Average: {:.1}, trend: {:+}%",
                refresh.craving.average, refresh.craving.trend
            );
            print_badges(&refresh.new_badges);
        }
        Err(e) => {
            eprintln!("  Stats not updated: {}", e);
            eprintln!("  Run `stride rebuild --user {}` to repair.", recorded.entry.user_id);
        }
    }
    Ok(())
}

fn cmd_session(engine: &Engine<FileStore>, new: NewExerciseSession) -> Result<()> {
    if !default_catalog().contains(&new.exercise_id) {
        return Err(Error::ValidationFailed(format!(
            "unknown exercise: {} (see `stride exercises`)",
            new.exercise_id
        )));
    }

    let recorded = engine.record_session(new)?;
    println!("✓ Session logged");

    match recorded.progress {
        None => {}
        Some(Ok(progress)) => {
            println!(
                "  Points: {}  Level: {}  Streak: {} day(s)",
                progress.user.points, progress.user.level, progress.stats.current_streak
            );
            print_badges(&progress.new_badges);
        }
        Some(Err(e)) => {
            eprintln!("  Progress not updated: {}", e);
            eprintln!(
                "  Run `stride rebuild --user {}` to repair.",
                recorded.session.user_id
            );
        }
    }
    Ok(())
}

fn cmd_stats(engine: &Engine<FileStore>, user_id: Uuid, days: Option<i64>) -> Result<()> {
    let user = engine
        .store()
        .get_user(user_id)?
        .ok_or(Error::NotFound {
            entity: "user",
            id: user_id,
        })?;
    let days = days.unwrap_or(engine.config().craving_window_days);

    let report = json!({
        "user": user,
        "stats": engine.user_stats(user_id)?,
        "craving": engine.craving_stats(user_id, days)?,
        "badges": engine.user_badges(user_id)?,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_rebuild(engine: &Engine<FileStore>, user_id: Uuid) -> Result<()> {
    let stats = engine.rebuild_stats(user_id)?;
    let new_badges = engine.evaluate_badges(user_id)?;

    println!("✓ Stats rebuilt");
    println!(
        "  Exercises: {}  Total: {} min  Average craving: {:.1}",
        stats.exercises_completed,
        stats.total_duration / 60,
        stats.average_craving
    );
    print_badges(&new_badges);
    Ok(())
}

fn cmd_exercises() -> Result<()> {
    for exercise in default_catalog().exercises.values() {
        println!(
            "{:<18} {:<22} {:>3} min  {:?}",
            exercise.id, exercise.title, exercise.suggested_minutes, exercise.category
        );
    }
    Ok(())
}

fn print_badges(badges: &[UserBadge]) {
    for badge in badges {
        println!("  ★ New badge: {}", badge.badge_type);
    }
}
