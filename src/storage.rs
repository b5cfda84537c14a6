//! Local key-value cache for generated quizzes and timestamps.
//!
//! The store is untrusted and shared across sessions: every read tolerates
//! missing or foreign data and falls back to a default, and every write is
//! fire-and-forget (failures are logged, never returned).
//!
//! Keys:
//!   daily_quizzes      : JSON array of Quiz
//!   quizzes_date       : RFC 3339 timestamp of the last daily batch
//!   last_generated_at  : epoch millis of the last user-triggered generation
//!   currentQuiz        : Quiz handed from the listing view to the play view

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  sync::{Arc, RwLock},
};

use chrono::{DateTime, TimeZone, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, warn};

use crate::domain::Quiz;
use crate::error::StorageError;

pub const KEY_DAILY_QUIZZES: &str = "daily_quizzes";
pub const KEY_QUIZZES_DATE: &str = "quizzes_date";
pub const KEY_LAST_GENERATED_AT: &str = "last_generated_at";
pub const KEY_CURRENT_QUIZ: &str = "currentQuiz";

/// String key-value storage in the spirit of browser `localStorage`.
pub trait KeyValueStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
  fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
  fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process store. `quota_bytes` bounds the summed size of keys and values.
#[derive(Default)]
pub struct MemoryStore {
  entries: RwLock<HashMap<String, String>>,
  quota_bytes: Option<usize>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  pub fn with_quota(quota_bytes: usize) -> Self {
    Self { entries: RwLock::default(), quota_bytes: Some(quota_bytes) }
  }
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
    let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
    Ok(entries.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
    let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
    if let Some(limit) = self.quota_bytes {
      let others: usize = entries.iter()
        .filter(|(k, _)| k.as_str() != key)
        .map(|(k, v)| k.len() + v.len())
        .sum();
      let needed = others + key.len() + value.len();
      if needed > limit {
        return Err(StorageError::QuotaExceeded { needed, limit });
      }
    }
    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StorageError> {
    let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
    entries.remove(key);
    Ok(())
  }
}

/// Single JSON object on disk. Every write rewrites the file via temp + rename,
/// so a crash mid-write leaves the previous version intact.
pub struct JsonFileStore {
  path: PathBuf,
  lock: RwLock<()>,
}

impl JsonFileStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into(), lock: RwLock::new(()) }
  }

  pub fn path(&self) -> &Path { &self.path }

  fn read_all(&self) -> Result<HashMap<String, String>, StorageError> {
    match std::fs::read_to_string(&self.path) {
      Ok(s) if s.trim().is_empty() => Ok(HashMap::new()),
      Ok(s) => Ok(serde_json::from_str(&s)?),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
      Err(e) => Err(e.into()),
    }
  }

  /// Current entries for a read-modify-write. A corrupt file is replaced
  /// rather than blocking every future write; I/O failures are returned so a
  /// transient error never wipes the other keys.
  fn read_for_write(&self) -> Result<HashMap<String, String>, StorageError> {
    match self.read_all() {
      Err(StorageError::Serde(e)) => {
        warn!(target: "quiz", path = %self.path.display(), error = %e, "Store file is corrupt; starting from empty");
        Ok(HashMap::new())
      }
      other => other,
    }
  }

  fn write_all(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
    if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
      std::fs::create_dir_all(dir)?;
    }
    let tmp = self.path.with_extension("tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
    std::fs::rename(&tmp, &self.path)?;
    Ok(())
  }
}

impl KeyValueStore for JsonFileStore {
  fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
    let _guard = self.lock.read().unwrap_or_else(|p| p.into_inner());
    Ok(self.read_all()?.remove(key))
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
    let _guard = self.lock.write().unwrap_or_else(|p| p.into_inner());
    let mut entries = self.read_for_write()?;
    entries.insert(key.to_string(), value.to_string());
    self.write_all(&entries)
  }

  fn remove(&self, key: &str) -> Result<(), StorageError> {
    let _guard = self.lock.write().unwrap_or_else(|p| p.into_inner());
    let mut entries = self.read_for_write()?;
    if entries.remove(key).is_some() {
      self.write_all(&entries)?;
    }
    Ok(())
  }
}

/// Typed, failure-tolerant view over a [`KeyValueStore`].
#[derive(Clone)]
pub struct LocalCache {
  store: Arc<dyn KeyValueStore>,
}

impl LocalCache {
  pub fn new(store: Arc<dyn KeyValueStore>) -> Self { Self { store } }

  pub fn save_quizzes(&self, quizzes: &[Quiz]) {
    self.write_json(KEY_DAILY_QUIZZES, quizzes);
  }

  /// Cached daily quizzes; empty when absent or unreadable.
  pub fn load_quizzes(&self) -> Vec<Quiz> {
    self.read_json(KEY_DAILY_QUIZZES).unwrap_or_default()
  }

  pub fn save_generation_timestamp(&self, ts: DateTime<Utc>) {
    self.write_raw(KEY_QUIZZES_DATE, &ts.to_rfc3339());
  }

  pub fn load_generation_timestamp(&self) -> Option<DateTime<Utc>> {
    let raw = self.read_raw(KEY_QUIZZES_DATE)?;
    // Older writers stored the ISO string JSON-encoded.
    let raw = raw.trim().trim_matches('"');
    match DateTime::parse_from_rfc3339(raw) {
      Ok(ts) => Some(ts.with_timezone(&Utc)),
      Err(e) => {
        warn!(target: "quiz", key = KEY_QUIZZES_DATE, error = %e, "Ignoring unreadable timestamp");
        None
      }
    }
  }

  pub fn save_last_generated_at(&self, ts: DateTime<Utc>) {
    self.write_json(KEY_LAST_GENERATED_AT, &ts.timestamp_millis());
  }

  pub fn load_last_generated_at(&self) -> Option<DateTime<Utc>> {
    let millis: i64 = self.read_json(KEY_LAST_GENERATED_AT)?;
    Utc.timestamp_millis_opt(millis).single()
  }

  pub fn save_current_quiz(&self, quiz: &Quiz) {
    self.write_json(KEY_CURRENT_QUIZ, quiz);
  }

  pub fn load_current_quiz(&self) -> Option<Quiz> {
    self.read_json(KEY_CURRENT_QUIZ)
  }

  pub fn clear_current_quiz(&self) {
    if let Err(e) = self.store.remove(KEY_CURRENT_QUIZ) {
      error!(target: "quiz", key = KEY_CURRENT_QUIZ, error = %e, "Failed to clear stored value");
    }
  }

  fn read_raw(&self, key: &str) -> Option<String> {
    match self.store.get(key) {
      Ok(v) => v,
      Err(e) => {
        warn!(target: "quiz", key, error = %e, "Storage read failed; treating as empty");
        None
      }
    }
  }

  fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let raw = self.read_raw(key)?;
    match serde_json::from_str::<T>(&raw) {
      Ok(v) => Some(v),
      Err(e) => {
        warn!(target: "quiz", key, error = %e, "Ignoring malformed stored value");
        None
      }
    }
  }

  fn write_raw(&self, key: &str, value: &str) {
    match self.store.set(key, value) {
      Ok(()) => debug!(target: "quiz", key, bytes = value.len(), "Stored value"),
      Err(e) => error!(target: "quiz", key, error = %e, "Storage write failed; continuing without cache"),
    }
  }

  fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
    match serde_json::to_string(value) {
      Ok(s) => self.write_raw(key, &s),
      Err(e) => error!(target: "quiz", key, error = %e, "Failed to serialize value for storage"),
    }
  }
}

/// True when `ts` falls on the same calendar day as `now`, in `now`'s time zone.
pub fn is_fresh<Tz: TimeZone>(ts: &DateTime<Utc>, now: &DateTime<Tz>) -> bool {
  ts.with_timezone(&now.timezone()).date_naive() == now.date_naive()
}
