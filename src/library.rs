use rand::seq::SliceRandom;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

use crate::metadata::{MetadataError, Video};
use crate::resolver::InvalidReference;
use crate::store::PrefStore;

/// Store key holding the persisted favorite-id list.
const FAVORITES_KEY: &str = "favorites";

/// Why an add-by-reference could not complete. These are the only
/// user-visible failures in the library; every other operation is total.
#[derive(Debug, Error)]
pub enum AddError {
  #[error("not a recognizable video URL")]
  InvalidReference(#[from] InvalidReference),
  #[error("could not retrieve the video: {0}")]
  AdditionFailed(#[from] MetadataError),
}

/// The authoritative session library: canonical ordered collection (seed +
/// user-added), the immutable seed-id set, the persisted favorite-id list,
/// and the current selection.
///
/// Invariants maintained by every operation:
/// - no duplicate ids in the collection;
/// - the selection is either empty or a known id (selection may briefly
///   name a seed id whose metadata has not arrived yet — the presentation
///   layer tolerates an id without a `Video`);
/// - favorites may reference ids absent from the collection; such ids are
///   skipped when producing the favorites view, never treated as errors.
pub struct Library {
  videos: Vec<Video>,
  seed_ids: Vec<String>,
  favorite_ids: Vec<String>,
  current_id: Option<String>,
  loading: bool,
  store: PrefStore,
}

impl Library {
  /// Build the session library. Favorites load synchronously (empty on any
  /// read failure); the selection starts as a uniformly random seed id so
  /// the player has something to show before seed metadata arrives.
  pub fn new(raw_seed_ids: &[String], store: PrefStore) -> Self {
    let mut seen = HashSet::new();
    let seed_ids: Vec<String> = raw_seed_ids.iter().filter(|id| seen.insert(id.as_str())).cloned().collect();

    let favorite_ids: Vec<String> = store.load_or(FAVORITES_KEY, Vec::new());
    let current_id = seed_ids.choose(&mut rand::thread_rng()).cloned();

    info!(seeds = seed_ids.len(), favorites = favorite_ids.len(), "library created");
    Self { videos: Vec::new(), seed_ids, favorite_ids, current_id, loading: true, store }
  }

  // --- Accessors ---

  pub fn videos(&self) -> &[Video] {
    &self.videos
  }

  pub fn seed_ids(&self) -> &[String] {
    &self.seed_ids
  }

  pub fn is_loading(&self) -> bool {
    self.loading
  }

  pub fn current_id(&self) -> Option<&str> {
    self.current_id.as_deref()
  }

  /// Metadata for the current selection, if it has arrived.
  pub fn current_video(&self) -> Option<&Video> {
    let id = self.current_id.as_deref()?;
    self.videos.iter().find(|v| v.id == id)
  }

  pub fn is_favorite(&self, id: &str) -> bool {
    self.favorite_ids.iter().any(|f| f == id)
  }

  pub fn is_seed(&self, id: &str) -> bool {
    self.seed_ids.iter().any(|s| s == id)
  }

  /// Favorites in favorite order, silently omitting ids that are not in the
  /// collection (e.g. a user-added favorite after a reset). The persisted
  /// list is never pruned on read.
  pub fn favorites_view(&self) -> Vec<&Video> {
    self.favorite_ids.iter().filter_map(|id| self.videos.iter().find(|v| v.id == *id)).collect()
  }

  pub fn is_favorites_resettable(&self) -> bool {
    !self.favorite_ids.is_empty()
  }

  pub fn is_user_videos_resettable(&self) -> bool {
    self.videos.len() > self.seed_ids.len()
  }

  // --- Mutations ---

  /// Install the fetched seed collection. User-added entries that raced the
  /// seed load keep their position at the front; a user add that duplicated
  /// a seed id collapses onto the seed entry.
  pub fn install_seed(&mut self, seed_videos: Vec<Video>) {
    self.videos.retain(|v| !seed_videos.iter().any(|s| s.id == v.id));
    self.videos.extend(seed_videos);
    self.loading = false;
    info!(total = self.videos.len(), "seed collection installed");
  }

  /// Set the current selection. No-op when `id` is already selected.
  ///
  /// Precondition: callers pass ids they obtained from this library (or the
  /// seed set). Membership is deliberately not checked — startup selects a
  /// seed id before its `Video` exists.
  pub fn select(&mut self, id: &str) {
    if self.current_id.as_deref() == Some(id) {
      return;
    }
    debug!(id, "selection changed");
    self.current_id = Some(id.to_string());
  }

  /// Symmetric favorite toggle: add appends to the end of the favorite
  /// order, remove filters out all occurrences. Persisted after each change.
  pub fn toggle_favorite(&mut self, id: &str) {
    if self.is_favorite(id) {
      self.favorite_ids.retain(|f| f != id);
      debug!(id, "favorite removed");
    } else {
      self.favorite_ids.push(id.to_string());
      debug!(id, "favorite added");
    }
    self.store.save(FAVORITES_KEY, &self.favorite_ids);
  }

  /// Insert a user-added video at the front of the collection and select it.
  /// If the id already exists this is a pure selection — never a duplicate.
  pub fn insert_user_video(&mut self, video: Video) {
    let id = video.id.clone();
    if self.videos.iter().any(|v| v.id == id) {
      self.select(&id);
      return;
    }
    info!(id = %id, "user video added");
    self.videos.insert(0, video);
    self.select(&id);
  }

  /// Clear the favorite list unconditionally and persist the empty list.
  pub fn reset_favorites(&mut self) {
    info!(count = self.favorite_ids.len(), "favorites reset");
    self.favorite_ids.clear();
    self.store.save(FAVORITES_KEY, &self.favorite_ids);
  }

  /// Drop every user-added video, keeping only seed entries. If the current
  /// selection was removed, re-pick a uniformly random seed id (or clear the
  /// selection when the seed set is empty). Idempotent.
  pub fn reset_user_videos(&mut self) {
    let before = self.videos.len();
    let seeds = &self.seed_ids;
    self.videos.retain(|v| seeds.iter().any(|s| *s == v.id));
    info!(removed = before - self.videos.len(), "user videos reset");

    let selection_gone = match self.current_id.as_deref() {
      Some(id) => !self.seed_ids.iter().any(|s| s == id),
      None => false,
    };
    if selection_gone {
      self.current_id = self.seed_ids.choose(&mut rand::thread_rng()).cloned();
      debug!(id = ?self.current_id, "selection repaired after reset");
    }
  }

  /// "Feeling lucky": re-select a uniformly random different video.
  /// Rejection sampling only terminates with more than one entry, so the
  /// precondition is checked first and the call is a no-op otherwise.
  pub fn pick_different(&mut self) {
    if self.videos.len() < 2 {
      return;
    }
    let mut rng = rand::thread_rng();
    loop {
      // Safety: videos is non-empty here, choose returns Some.
      let candidate = self.videos.choose(&mut rng).map(|v| v.id.clone()).unwrap_or_default();
      if self.current_id.as_deref() != Some(candidate.as_str()) {
        self.select(&candidate);
        return;
      }
    }
  }
}
