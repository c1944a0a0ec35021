use directories::ProjectDirs;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Persisted key-value store: one JSON file per key under the platform data
/// directory. Reads fall back to a caller-supplied default and writes are
/// best-effort — persistence being unavailable never fails a user action.
#[derive(Debug, Clone)]
pub struct PrefStore {
  dir: Option<PathBuf>,
}

impl PrefStore {
  /// Open the store at the platform data directory. When no home directory
  /// can be determined the store still works, it just never persists.
  pub fn open() -> Self {
    let dir = ProjectDirs::from("", "", "tvcade").map(|dirs| dirs.data_dir().to_path_buf());
    if dir.is_none() {
      warn!("no platform data directory available, preferences will not persist");
    }
    Self { dir }
  }

  /// Open the store rooted at an explicit directory.
  pub fn at(dir: PathBuf) -> Self {
    Self { dir: Some(dir) }
  }

  fn key_path(&self, key: &str) -> Option<PathBuf> {
    self.dir.as_ref().map(|d| d.join(format!("{}.json", key)))
  }

  /// Read the value stored under `key`, or `default` on any failure
  /// (missing directory, missing file, unreadable JSON).
  pub fn load_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
    let Some(path) = self.key_path(key) else { return default };
    let Ok(content) = std::fs::read_to_string(&path) else {
      debug!(key, "no persisted value, using default");
      return default;
    };
    match serde_json::from_str(&content) {
      Ok(value) => value,
      Err(e) => {
        warn!(key, err = %e, "persisted value unreadable, using default");
        default
      }
    }
  }

  /// Write `value` under `key`. Failures are logged and swallowed.
  pub fn save<T: Serialize>(&self, key: &str, value: &T) {
    let Some(path) = self.key_path(key) else { return };
    if let Some(parent) = path.parent()
      && let Err(e) = std::fs::create_dir_all(parent)
    {
      warn!(key, err = %e, "could not create store directory");
      return;
    }
    match serde_json::to_string(value) {
      Ok(json) => {
        if let Err(e) = std::fs::write(&path, json) {
          warn!(key, err = %e, "could not persist value");
        }
      }
      Err(e) => warn!(key, err = %e, "could not serialize value"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_key_yields_default() {
    let tmp = tempfile::tempdir().unwrap();
    let store = PrefStore::at(tmp.path().to_path_buf());
    let ids: Vec<String> = store.load_or("favorites", Vec::new());
    assert!(ids.is_empty());
  }

  #[test]
  fn save_then_load_round_trips() {
    let tmp = tempfile::tempdir().unwrap();
    let store = PrefStore::at(tmp.path().to_path_buf());
    store.save("favorites", &vec!["abc".to_string(), "def".to_string()]);
    let ids: Vec<String> = store.load_or("favorites", Vec::new());
    assert_eq!(ids, vec!["abc", "def"]);
  }

  #[test]
  fn corrupt_file_yields_default() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("favorites.json"), "{not json").unwrap();
    let store = PrefStore::at(tmp.path().to_path_buf());
    let ids: Vec<String> = store.load_or("favorites", vec!["fallback".to_string()]);
    assert_eq!(ids, vec!["fallback"]);
  }

  #[test]
  fn save_creates_missing_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let nested = tmp.path().join("deeper").join("still");
    let store = PrefStore::at(nested);
    store.save("favorites", &vec!["abc".to_string()]);
    let ids: Vec<String> = store.load_or("favorites", Vec::new());
    assert_eq!(ids, vec!["abc"]);
  }
}
