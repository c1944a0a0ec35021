//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available —
//! no runtime file I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  /// Raw seed id list as shipped; deduplicated by the library on load.
  pub seed_video_ids: Vec<String>,

  // Metadata service
  pub oembed_endpoint: String,
  pub watch_url_prefix: String,
  pub fallback_thumb_template: String,
  pub video_id_len: usize,
  pub request_timeout_secs: u64,

  // Arcade panel feedback
  pub panel_click_period_ms: u64,
  pub click_freq_hz: f32,
  pub click_decay_ms: f32,
  pub click_duration_ms: u64,

  // UI
  pub error_dismiss_secs: u64,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is a build-time error.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
