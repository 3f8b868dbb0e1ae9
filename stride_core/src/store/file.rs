//! Durable store rooted at a data directory.
//!
//! Layout:
//! - `log/cravings.jsonl`, `log/sessions.jsonl`: append-only event logs
//! - `state.json`: users, stats, badges and applied session ids
//! - `store.lock`: guards every read-modify-write of `state.json`
//!
//! State updates hold an exclusive lock on `store.lock` for the whole
//! read-modify-write and replace `state.json` by atomic rename, so
//! concurrent writers (threads or processes) never lose an update.

use super::jsonl::JsonlLog;
use super::ledger::Ledger;
use super::{most_recent, CompletionOutcome, Store};
use crate::config::StoreConfig;
use crate::progression::Completion;
use crate::{
    BadgeType, CravingEntry, Error, ExerciseSession, NewCravingEntry, NewExerciseSession,
    NewUser, Result, StatsPatch, User, UserBadge, UserStats,
};
use chrono::Utc;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use uuid::Uuid;

const STATE_FILE: &str = "state.json";
const LOCK_FILE: &str = "store.lock";

/// Store persisted as JSON files under one directory
pub struct FileStore {
    root: PathBuf,
    cravings: JsonlLog<CravingEntry>,
    sessions: JsonlLog<ExerciseSession>,
    lock_timeout: Duration,
    lock_retry: Duration,
}

/// Held lock on `store.lock`, released on drop
struct StoreLock {
    file: File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to release store lock: {}", e);
        }
    }
}

#[derive(Clone, Copy)]
enum LockMode {
    Shared,
    Exclusive,
}

impl FileStore {
    /// Open (creating if needed) a store with default lock settings
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_config(root, &StoreConfig::default())
    }

    pub fn with_config(root: impl Into<PathBuf>, config: &StoreConfig) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join("log"))?;

        tracing::debug!("Opened file store at {:?}", root);
        Ok(Self {
            cravings: JsonlLog::new(root.join("log").join("cravings.jsonl")),
            sessions: JsonlLog::new(root.join("log").join("sessions.jsonl")),
            lock_timeout: Duration::from_millis(config.lock_timeout_ms),
            lock_retry: Duration::from_millis(config.lock_retry_ms.max(1)),
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn state_path(&self) -> PathBuf {
        self.root.join(STATE_FILE)
    }

    /// Poll for the store lock until the configured timeout
    fn lock(&self, mode: LockMode) -> Result<StoreLock> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(self.root.join(LOCK_FILE))?;

        let deadline = Instant::now() + self.lock_timeout;
        loop {
            let attempt = match mode {
                LockMode::Shared => FileExt::try_lock_shared(&file),
                LockMode::Exclusive => FileExt::try_lock_exclusive(&file),
            };
            match attempt {
                Ok(()) => return Ok(StoreLock { file }),
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                    if Instant::now() >= deadline {
                        return Err(Error::ConcurrencyConflict(format!(
                            "store lock at {:?} busy for {:?}",
                            self.root, self.lock_timeout
                        )));
                    }
                    std::thread::sleep(self.lock_retry);
                }
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }

    /// Load the state document; caller must hold the store lock
    fn load_state(&self) -> Result<Ledger> {
        let path = self.state_path();
        if !path.exists() {
            return Ok(Ledger::default());
        }

        let mut contents = String::new();
        File::open(&path)?.read_to_string(&mut contents)?;

        serde_json::from_str(&contents).map_err(|e| {
            tracing::warn!("Failed to parse state file {:?}: {}", path, e);
            Error::State(format!("unreadable state file {:?}: {}", path, e))
        })
    }

    /// Atomically replace the state document; caller must hold the lock
    fn save_state(&self, ledger: &Ledger) -> Result<()> {
        let mut temp = NamedTempFile::new_in(&self.root)?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file_mut());
            serde_json::to_writer(&mut writer, ledger)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(self.state_path())
            .map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved store state to {:?}", self.root);
        Ok(())
    }

    fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> Result<R> {
        let _lock = self.lock(LockMode::Shared)?;
        let ledger = self.load_state()?;
        Ok(f(&ledger))
    }

    /// Read-modify-write under the exclusive lock.
    ///
    /// `f` returns whether it changed anything; unchanged state is not
    /// rewritten. An error from `f` leaves the file untouched.
    fn update<R>(&self, f: impl FnOnce(&mut Ledger) -> Result<(R, bool)>) -> Result<R> {
        let _lock = self.lock(LockMode::Exclusive)?;
        let mut ledger = self.load_state()?;
        let (result, changed) = f(&mut ledger)?;
        if changed {
            self.save_state(&ledger)?;
        }
        Ok(result)
    }

    fn require_user(&self, user_id: Uuid) -> Result<()> {
        if self.read(|ledger| ledger.contains_user(user_id))? {
            Ok(())
        } else {
            Err(Error::user_not_found(user_id))
        }
    }
}

impl Store for FileStore {
    fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.read(|ledger| ledger.user(id))
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.read(|ledger| ledger.user_by_email(email))
    }

    fn create_user(&self, new: NewUser) -> Result<User> {
        let user = self.update(|ledger| Ok((ledger.create_user(new, Utc::now())?, true)))?;
        tracing::debug!("Created user {}", user.id);
        Ok(user)
    }

    fn update_user_stats(&self, user_id: Uuid, patch: &StatsPatch) -> Result<UserStats> {
        self.update(|ledger| Ok((ledger.update_stats(user_id, patch, Utc::now())?, true)))
    }

    fn get_user_stats(&self, user_id: Uuid) -> Result<Option<UserStats>> {
        self.read(|ledger| ledger.stats(user_id))
    }

    fn create_craving_entry(&self, new: NewCravingEntry) -> Result<CravingEntry> {
        self.require_user(new.user_id)?;

        let entry = CravingEntry {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            intensity: new.intensity,
            triggers: new.triggers,
            emotions: new.emotions,
            notes: new.notes,
            created_at: new.created_at.unwrap_or_else(Utc::now),
        };
        self.cravings.append(&entry)?;
        Ok(entry)
    }

    fn get_craving_entries(&self, user_id: Uuid, limit: usize) -> Result<Vec<CravingEntry>> {
        let rows = self
            .cravings
            .read_all()?
            .into_iter()
            .filter(|e| e.user_id == user_id)
            .collect();
        Ok(most_recent(rows, limit, |e: &CravingEntry| e.created_at))
    }

    fn create_exercise_session(&self, new: NewExerciseSession) -> Result<ExerciseSession> {
        self.require_user(new.user_id)?;

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
        self.sessions.append(&session)?;
        Ok(session)
    }

    fn get_exercise_sessions(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ExerciseSession>> {
        let rows = self
            .sessions
            .read_all()?
            .into_iter()
            .filter(|s| s.user_id == user_id)
            .collect();
        Ok(most_recent(rows, limit, |s: &ExerciseSession| s.created_at))
    }

    fn get_user_badges(&self, user_id: Uuid) -> Result<Vec<UserBadge>> {
        self.read(|ledger| ledger.badges(user_id))
    }

    fn award_badge(&self, user_id: Uuid, badge_type: BadgeType) -> Result<UserBadge> {
        self.update(|ledger| ledger.award_badge(user_id, badge_type, Utc::now()))
    }

    fn apply_completion(&self, completion: &Completion) -> Result<CompletionOutcome> {
        self.update(|ledger| {
            let outcome = ledger.apply_completion(completion, Utc::now())?;
            let changed = outcome.was_applied();
            Ok((outcome, changed))
        })
    }
}
