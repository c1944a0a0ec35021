//! Audible click feedback for the arcade panel.
//!
//! A dedicated audio thread owns the rodio output stream. The stream is
//! opened lazily on the first click and reused for the process lifetime;
//! if the device cannot be opened, clicks are dropped silently — feedback
//! is cosmetic and must never fail a button transition.

use rodio::{OutputStream, OutputStreamBuilder, Source};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::Duration;
use tracing::{debug, warn};

use crate::constants::constants;

const SAMPLE_RATE: u32 = 44_100;

/// Side-effect boundary for button feedback. The panel state machine only
/// knows this trait, which keeps its tests silent and countable.
pub trait Feedback: Send + Sync {
  /// Emit one short click. Must not block and must not fail observably.
  fn click(&self);
}

/// No-op feedback for `--silent` mode.
pub struct SilentFeedback;

impl Feedback for SilentFeedback {
  fn click(&self) {}
}

/// Runtime mute switch over any feedback implementation. The panel holds
/// this as its `Feedback`; the app toggles it without rebuilding the panel.
pub struct SwitchedFeedback {
  inner: Arc<dyn Feedback>,
  enabled: AtomicBool,
}

impl SwitchedFeedback {
  pub fn new(inner: Arc<dyn Feedback>, enabled: bool) -> Arc<Self> {
    Arc::new(Self { inner, enabled: AtomicBool::new(enabled) })
  }

  /// Flip the switch; returns the new state.
  pub fn toggle(&self) -> bool {
    !self.enabled.fetch_xor(true, Ordering::SeqCst)
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled.load(Ordering::SeqCst)
  }
}

impl Feedback for SwitchedFeedback {
  fn click(&self) {
    if self.is_enabled() {
      self.inner.click();
    }
  }
}

enum AudioCmd {
  Click,
}

/// Handle to the audio thread. Cloneable and cheap; dropping every handle
/// closes the command channel and ends the thread.
#[derive(Clone)]
pub struct AudioFeedback {
  tx: Sender<AudioCmd>,
}

impl AudioFeedback {
  pub fn spawn() -> Self {
    let (tx, rx) = channel();
    // If the thread cannot start, the receiver is dropped and every send
    // quietly fails — clicks degrade to silence.
    if let Err(e) = std::thread::Builder::new().name("audio-feedback".to_string()).spawn(move || audio_thread(rx)) {
      warn!(err = %e, "could not start audio thread, feedback disabled");
    }
    Self { tx }
  }
}

impl Feedback for AudioFeedback {
  fn click(&self) {
    // A closed channel means the audio thread is gone; feedback degrades to silence.
    let _ = self.tx.send(AudioCmd::Click);
  }
}

fn audio_thread(rx: Receiver<AudioCmd>) {
  let mut stream: Option<OutputStream> = None;
  let mut open_failed = false;

  while let Ok(cmd) = rx.recv() {
    match cmd {
      AudioCmd::Click => {
        if stream.is_none() && !open_failed {
          match OutputStreamBuilder::open_default_stream() {
            Ok(s) => {
              debug!("audio output stream opened");
              stream = Some(s);
            }
            Err(e) => {
              warn!(err = %e, "audio device unavailable, feedback disabled");
              open_failed = true;
            }
          }
        }
        if let Some(ref s) = stream {
          s.mixer().add(ClickWave::new());
        }
      }
    }
  }
}

/// One feedback click: a fixed-frequency sine with a fast exponential decay
/// envelope, well under 50 ms total.
pub struct ClickWave {
  freq_hz: f32,
  decay_secs: f32,
  total_samples: usize,
  pos: usize,
}

impl ClickWave {
  pub fn new() -> Self {
    let c = constants();
    Self::with_params(c.click_freq_hz, c.click_decay_ms / 1000.0, Duration::from_millis(c.click_duration_ms))
  }

  fn with_params(freq_hz: f32, decay_secs: f32, duration: Duration) -> Self {
    let total_samples = (duration.as_secs_f32() * SAMPLE_RATE as f32) as usize;
    Self { freq_hz, decay_secs, total_samples, pos: 0 }
  }
}

impl Iterator for ClickWave {
  type Item = f32;

  fn next(&mut self) -> Option<f32> {
    if self.pos >= self.total_samples {
      return None;
    }
    let t = self.pos as f32 / SAMPLE_RATE as f32;
    let envelope = (-t / self.decay_secs).exp();
    let sample = (std::f32::consts::TAU * self.freq_hz * t).sin() * envelope * 0.4;
    self.pos += 1;
    Some(sample)
  }
}

impl Source for ClickWave {
  fn current_span_len(&self) -> Option<usize> {
    Some(self.total_samples.saturating_sub(self.pos))
  }

  fn channels(&self) -> u16 {
    1
  }

  fn sample_rate(&self) -> u32 {
    SAMPLE_RATE
  }

  fn total_duration(&self) -> Option<Duration> {
    Some(Duration::from_secs_f32(self.total_samples as f32 / SAMPLE_RATE as f32))
  }
}
