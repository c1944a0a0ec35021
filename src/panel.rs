//! Momentary-button state machine for the three arcade buttons.
//!
//! Every input source (keyboard, mouse down/up, pointer-leave) fans in
//! through the same idempotent [`ControlPanel::apply`] transitions, so
//! overlapping sources cannot double-start a click timer or leave a button
//! stuck. Per-button state is a fixed 3-slot table: the button set is
//! closed and known at compile time.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::audio::Feedback;
use crate::constants::constants;

/// One of the three logical buttons, independent of the physical input
/// source driving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadButton {
  Red,
  Blue,
  Yellow,
}

impl PadButton {
  pub const ALL: [PadButton; 3] = [PadButton::Red, PadButton::Blue, PadButton::Yellow];

  pub fn index(self) -> usize {
    match self {
      PadButton::Red => 0,
      PadButton::Blue => 1,
      PadButton::Yellow => 2,
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      PadButton::Red => "RED",
      PadButton::Blue => "BLUE",
      PadButton::Yellow => "YELLOW",
    }
  }
}

/// Explicit input message consumed by the state machine. Key handlers and
/// mouse handlers both reduce their events to these two, which makes the
/// transition log replayable in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelEvent {
  Press(PadButton),
  Release(PadButton),
}

/// Per-button state. Invariant: `timer` is `Some` iff `pressed`, and there
/// is never more than one timer per button.
#[derive(Default)]
struct ButtonSlot {
  pressed: bool,
  timer: Option<JoinHandle<()>>,
}

pub struct ControlPanel {
  feedback: Arc<dyn Feedback>,
  slots: [ButtonSlot; 3],
}

impl ControlPanel {
  pub fn new(feedback: Arc<dyn Feedback>) -> Self {
    Self { feedback, slots: [ButtonSlot::default(), ButtonSlot::default(), ButtonSlot::default()] }
  }

  pub fn apply(&mut self, event: PanelEvent) {
    match event {
      PanelEvent::Press(button) => self.press(button),
      PanelEvent::Release(button) => self.release(button),
    }
  }

  /// Transition to `Pressed`: one immediate click, then a repeating click
  /// every panel period until release. A press while already pressed is a
  /// no-op, so duplicate events from overlapping sources are harmless.
  pub fn press(&mut self, button: PadButton) {
    let slot = &mut self.slots[button.index()];
    if slot.pressed {
      return;
    }
    // A stale handle here would violate the timer-iff-pressed invariant;
    // cancel it before starting a fresh one.
    if let Some(handle) = slot.timer.take() {
      handle.abort();
    }
    slot.pressed = true;
    debug!(button = button.label(), "pressed");
    self.feedback.click();

    let feedback = Arc::clone(&self.feedback);
    let period = Duration::from_millis(constants().panel_click_period_ms);
    slot.timer = Some(tokio::spawn(async move {
      // First interval fires one period after the press — the immediate
      // click above already covered t=0.
      let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
      loop {
        ticker.tick().await;
        feedback.click();
      }
    }));
  }

  /// Transition to `Released`: cancel and clear the repeating timer.
  /// Releasing an already-released button is a no-op.
  pub fn release(&mut self, button: PadButton) {
    let slot = &mut self.slots[button.index()];
    if !slot.pressed {
      return;
    }
    slot.pressed = false;
    debug!(button = button.label(), "released");
    if let Some(handle) = slot.timer.take() {
      handle.abort();
    }
  }

  /// Release every button. Used when the terminal loses focus, since key-up
  /// events for held keys will never arrive.
  pub fn release_all(&mut self) {
    for button in PadButton::ALL {
      self.release(button);
    }
  }

  pub fn is_pressed(&self, button: PadButton) -> bool {
    self.slots[button.index()].pressed
  }

  #[cfg(test)]
  fn timer_active(&self, button: PadButton) -> bool {
    self.slots[button.index()].timer.is_some()
  }
}

impl Drop for ControlPanel {
  fn drop(&mut self) {
    for slot in &mut self.slots {
      if let Some(handle) = slot.timer.take() {
        handle.abort();
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  struct CountingFeedback {
    clicks: AtomicUsize,
  }

  impl CountingFeedback {
    fn new() -> Arc<Self> {
      Arc::new(Self { clicks: AtomicUsize::new(0) })
    }

    fn count(&self) -> usize {
      self.clicks.load(Ordering::SeqCst)
    }
  }

  impl Feedback for CountingFeedback {
    fn click(&self) {
      self.clicks.fetch_add(1, Ordering::SeqCst);
    }
  }

  fn period() -> Duration {
    Duration::from_millis(constants().panel_click_period_ms)
  }

  /// Step the paused clock one panel period and let the timer task run.
  async fn advance_one_period() {
    // Let freshly spawned timer tasks poll once and register their timers
    // before the clock moves, or the advance passes them by.
    for _ in 0..8 {
      tokio::task::yield_now().await;
    }
    tokio::time::advance(period()).await;
    for _ in 0..8 {
      tokio::task::yield_now().await;
    }
  }

  #[tokio::test(start_paused = true)]
  async fn duplicate_press_clicks_once_and_starts_one_timer() {
    let feedback = CountingFeedback::new();
    let mut panel = ControlPanel::new(feedback.clone());

    panel.apply(PanelEvent::Press(PadButton::Red));
    panel.apply(PanelEvent::Press(PadButton::Red));

    assert_eq!(feedback.count(), 1);
    assert!(panel.is_pressed(PadButton::Red));
    assert!(panel.timer_active(PadButton::Red));

    // Exactly one repeating timer: three periods add three clicks.
    for _ in 0..3 {
      advance_one_period().await;
    }
    assert_eq!(feedback.count(), 4);
  }

  #[tokio::test(start_paused = true)]
  async fn release_stops_the_repeating_timer() {
    let feedback = CountingFeedback::new();
    let mut panel = ControlPanel::new(feedback.clone());

    panel.press(PadButton::Blue);
    advance_one_period().await;
    advance_one_period().await;
    assert_eq!(feedback.count(), 3);

    panel.release(PadButton::Blue);
    assert!(!panel.is_pressed(PadButton::Blue));
    assert!(!panel.timer_active(PadButton::Blue));

    for _ in 0..5 {
      advance_one_period().await;
    }
    assert_eq!(feedback.count(), 3, "no clicks may arrive after release");
  }

  #[tokio::test(start_paused = true)]
  async fn double_release_is_a_noop() {
    let feedback = CountingFeedback::new();
    let mut panel = ControlPanel::new(feedback.clone());

    panel.press(PadButton::Red);
    panel.release(PadButton::Red);
    panel.release(PadButton::Red);

    assert!(!panel.is_pressed(PadButton::Red));
    assert!(!panel.timer_active(PadButton::Red));
    assert_eq!(feedback.count(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn release_without_press_is_ignored() {
    let feedback = CountingFeedback::new();
    let mut panel = ControlPanel::new(feedback.clone());
    panel.release(PadButton::Yellow);
    assert_eq!(feedback.count(), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn buttons_are_independent() {
    let feedback = CountingFeedback::new();
    let mut panel = ControlPanel::new(feedback.clone());

    panel.press(PadButton::Red);
    panel.press(PadButton::Yellow);
    assert_eq!(feedback.count(), 2);

    advance_one_period().await;
    assert_eq!(feedback.count(), 4, "both timers click each period");

    panel.release(PadButton::Red);
    advance_one_period().await;
    assert_eq!(feedback.count(), 5, "only the held button keeps clicking");
    assert!(panel.is_pressed(PadButton::Yellow));
  }

  #[tokio::test(start_paused = true)]
  async fn overlapping_sources_cannot_desynchronize() {
    let feedback = CountingFeedback::new();
    let mut panel = ControlPanel::new(feedback.clone());

    // Touch-start racing key-down for the same button, then both release.
    panel.apply(PanelEvent::Press(PadButton::Red));
    panel.apply(PanelEvent::Press(PadButton::Red));
    panel.apply(PanelEvent::Release(PadButton::Red));
    panel.apply(PanelEvent::Release(PadButton::Red));

    assert!(!panel.is_pressed(PadButton::Red));
    assert!(!panel.timer_active(PadButton::Red));
    assert_eq!(feedback.count(), 1);

    for _ in 0..3 {
      advance_one_period().await;
    }
    assert_eq!(feedback.count(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn release_all_clears_every_button() {
    let feedback = CountingFeedback::new();
    let mut panel = ControlPanel::new(feedback.clone());
    for button in PadButton::ALL {
      panel.press(button);
    }
    panel.release_all();
    for button in PadButton::ALL {
      assert!(!panel.is_pressed(button));
      assert!(!panel.timer_active(button));
    }
  }
}
