use ratatui::layout::{Position, Rect};
use ratatui::widgets::ListState;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::info;

use crate::constants::constants;
use crate::library::{AddError, Library};
use crate::metadata::{MetadataError, Video, fetch_many, fetch_one};
use crate::panel::{ControlPanel, PadButton, PanelEvent};
use crate::resolver::resolve_video_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  Browse,
  Favorites,
  /// Text-entry mode for adding a video by URL. While active, the panel key
  /// dispatcher treats key-downs as typing, not button presses.
  AddUrl,
}

/// In-flight async task receivers.
#[derive(Default)]
pub(crate) struct AsyncTasks {
  pub(crate) seed_rx: Option<oneshot::Receiver<Vec<Video>>>,
  /// Carries the originating id alongside the result so a completion can
  /// never be attributed to the wrong video.
  pub(crate) add_rx: Option<oneshot::Receiver<(String, Result<Video, MetadataError>)>>,
}

/// The owned session object: library, arcade panel, input modes, and
/// in-flight async work. Constructed once in `run` and passed by reference
/// everywhere — no process-wide state beyond the audio device thread.
pub struct App {
  pub library: Library,
  pub panel: ControlPanel,
  pub mode: AppMode,
  pub input: String,
  pub cursor_position: usize,
  pub list_state: ListState,
  pub last_error: Option<String>,
  pub status_message: Option<String>,
  pub should_quit: bool,
  /// Button hitboxes recorded by the renderer each frame, indexed by
  /// `PadButton::index()`. None until the first draw.
  pub button_areas: [Option<Rect>; 3],
  /// Which button the pointer is currently holding down, if any. Lets a
  /// drag off the control release it instead of leaving it stuck.
  pointer_held: Option<PadButton>,
  pub(crate) tasks: AsyncTasks,
  http: Client,
  error_time: Option<Instant>,
}

impl App {
  pub fn new(library: Library, panel: ControlPanel) -> Self {
    Self {
      library,
      panel,
      mode: AppMode::Browse,
      input: String::new(),
      cursor_position: 0,
      list_state: ListState::default(),
      last_error: None,
      status_message: None,
      should_quit: false,
      button_areas: [None; 3],
      pointer_held: None,
      tasks: AsyncTasks::default(),
      http: Client::new(),
      error_time: None,
    }
  }

  pub fn text_entry_focused(&self) -> bool {
    self.mode == AppMode::AddUrl
  }

  /// Set an error message with auto-dismiss tracking.
  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  /// Clear stale error messages after the dismiss window.
  pub fn expire_error(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(constants().error_dismiss_secs)
    {
      self.clear_error();
    }
  }

  // --- List navigation ---

  /// Ids visible in the current list: the whole collection in Browse and
  /// AddUrl, the favorites view in Favorites.
  pub fn visible_ids(&self) -> Vec<String> {
    match self.mode {
      AppMode::Favorites => self.library.favorites_view().iter().map(|v| v.id.clone()).collect(),
      AppMode::Browse | AppMode::AddUrl => self.library.videos().iter().map(|v| v.id.clone()).collect(),
    }
  }

  pub fn move_selection(&mut self, down: bool) {
    let count = self.visible_ids().len();
    if count == 0 {
      return;
    }
    let i = match (self.list_state.selected(), down) {
      (Some(i), true) => (i + 1) % count,
      (Some(i), false) => {
        if i == 0 {
          count - 1
        } else {
          i - 1
        }
      }
      (None, _) => 0,
    };
    self.list_state.select(Some(i));
  }

  /// Enter: make the highlighted list entry the current video.
  pub fn select_highlighted(&mut self) {
    let ids = self.visible_ids();
    if let Some(id) = self.list_state.selected().and_then(|i| ids.get(i)) {
      self.library.select(id);
    }
  }

  pub fn toggle_favorite_highlighted(&mut self) {
    let ids = self.visible_ids();
    if let Some(id) = self.list_state.selected().and_then(|i| ids.get(i)) {
      self.library.toggle_favorite(id);
      // In the favorites view an un-favorite shrinks the list under the cursor.
      self.clamp_selection();
    }
  }

  pub fn set_mode(&mut self, mode: AppMode) {
    self.mode = mode;
    self.clamp_selection();
  }

  /// Keep the list cursor valid after the visible list changed shape.
  pub fn clamp_selection(&mut self) {
    let count = self.visible_ids().len();
    if count == 0 {
      self.list_state.select(None);
      return;
    }
    match self.list_state.selected() {
      Some(i) if i < count => {}
      Some(_) => self.list_state.select(Some(count - 1)),
      None => self.list_state.select(Some(0)),
    }
  }

  // --- Pointer fan-in to the panel ---

  pub fn pointer_down(&mut self, col: u16, row: u16) {
    for button in PadButton::ALL {
      if let Some(area) = self.button_areas[button.index()]
        && area.contains(Position { x: col, y: row })
      {
        self.pointer_held = Some(button);
        self.panel.apply(PanelEvent::Press(button));
        return;
      }
    }
  }

  pub fn pointer_up(&mut self) {
    if let Some(button) = self.pointer_held.take() {
      self.panel.apply(PanelEvent::Release(button));
    }
  }

  /// Dragging the pointer off a held button is an implicit release.
  pub fn pointer_moved(&mut self, col: u16, row: u16) {
    if let Some(button) = self.pointer_held {
      let still_inside = self.button_areas[button.index()]
        .map(|area| area.contains(Position { x: col, y: row }))
        .unwrap_or(false);
      if !still_inside {
        self.pointer_held = None;
        self.panel.apply(PanelEvent::Release(button));
      }
    }
  }

  // --- Async task orchestration ---

  /// Kick off the seed metadata fetch. The selection was already chosen at
  /// library construction, so there is something to show while this runs.
  pub fn trigger_load_seed(&mut self) {
    let ids = self.library.seed_ids().to_vec();
    let client = self.http.clone();
    self.status_message = Some("Loading library…".to_string());

    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(fetch_many(&client, &ids).await);
    });
    self.tasks.seed_rx = Some(rx);
  }

  /// Resolve the typed text and start the single-id metadata fetch.
  /// An unrecognizable reference fails immediately with no state change;
  /// a reference to a known id is a pure selection with nothing to fetch.
  pub fn trigger_add(&mut self) {
    let text = self.input.trim().to_string();
    if text.is_empty() {
      self.set_error("Paste a video URL first.".to_string());
      return;
    }
    let id = match resolve_video_id(&text) {
      Ok(id) => id,
      Err(e) => {
        self.set_error(AddError::from(e).to_string());
        return;
      }
    };

    if self.library.videos().iter().any(|v| v.id == id) {
      info!(id, "add resolved to an existing entry, selecting it");
      self.library.select(&id);
      self.finish_add_input();
      return;
    }

    self.clear_error();
    self.status_message = Some(format!("Adding {}…", id));
    let client = self.http.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let result = fetch_one(&client, &id).await;
      let _ = tx.send((id, result));
    });
    self.tasks.add_rx = Some(rx);
  }

  fn finish_add_input(&mut self) {
    self.input.clear();
    self.cursor_position = 0;
    self.status_message = None;
    self.clear_error();
    self.set_mode(AppMode::Browse);
  }

  /// Drain completed async work. Called once per loop turn; pending
  /// receivers are put back untouched.
  pub fn check_pending(&mut self) {
    if let Some(mut rx) = self.tasks.seed_rx.take() {
      match rx.try_recv() {
        Ok(videos) => {
          self.status_message = None;
          self.library.install_seed(videos);
          if self.list_state.selected().is_none() && !self.library.videos().is_empty() {
            self.list_state.select(Some(0));
          }
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.seed_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.status_message = None;
          self.set_error("Library load task failed.".to_string());
        }
      }
    }

    if let Some(mut rx) = self.tasks.add_rx.take() {
      match rx.try_recv() {
        Ok((id, result)) => {
          self.status_message = None;
          match result {
            Ok(video) => {
              debug_assert_eq!(video.id, id);
              self.library.insert_user_video(video);
              self.finish_add_input();
            }
            Err(e) => {
              // Nothing was inserted; the collection and selection are untouched.
              self.set_error(AddError::from(e).to_string());
            }
          }
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.add_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.status_message = None;
          self.set_error("Add task failed.".to_string());
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::audio::SilentFeedback;
  use crate::metadata::fallback_video;
  use crate::store::PrefStore;
  use std::sync::Arc;

  fn app(seeds: &[&str], dir: &std::path::Path) -> App {
    let seed_ids: Vec<String> = seeds.iter().map(|s| s.to_string()).collect();
    let mut library = Library::new(&seed_ids, PrefStore::at(dir.to_path_buf()));
    library.install_seed(seeds.iter().map(|id| fallback_video(id)).collect());
    App::new(library, ControlPanel::new(Arc::new(SilentFeedback)))
  }

  #[tokio::test]
  async fn invalid_reference_sets_error_without_mutating() {
    let tmp = tempfile::tempdir().unwrap();
    let mut app = app(&["aaaaaaaaaaa"], tmp.path());
    let before: Vec<String> = app.library.videos().iter().map(|v| v.id.clone()).collect();

    app.input = "not a url".to_string();
    app.trigger_add();

    assert!(app.last_error.is_some());
    assert!(app.tasks.add_rx.is_none(), "no fetch may be spawned for a bad reference");
    let after: Vec<String> = app.library.videos().iter().map(|v| v.id.clone()).collect();
    assert_eq!(before, after);
  }

  #[tokio::test]
  async fn adding_a_known_id_is_a_pure_selection() {
    let tmp = tempfile::tempdir().unwrap();
    let mut app = app(&["aaaaaaaaaaa", "bbbbbbbbbbb"], tmp.path());
    app.set_mode(AppMode::AddUrl);
    app.input = "https://youtu.be/bbbbbbbbbbb".to_string();
    app.trigger_add();

    assert!(app.tasks.add_rx.is_none());
    assert_eq!(app.library.current_id(), Some("bbbbbbbbbbb"));
    assert_eq!(app.library.videos().len(), 2);
    assert_eq!(app.mode, AppMode::Browse);
  }

  #[tokio::test]
  async fn favorites_mode_lists_only_favorites() {
    let tmp = tempfile::tempdir().unwrap();
    let mut app = app(&["aaaaaaaaaaa", "bbbbbbbbbbb"], tmp.path());
    app.library.toggle_favorite("bbbbbbbbbbb");
    app.set_mode(AppMode::Favorites);
    assert_eq!(app.visible_ids(), vec!["bbbbbbbbbbb"]);
  }

  #[tokio::test]
  async fn pointer_drag_off_button_releases_it() {
    let tmp = tempfile::tempdir().unwrap();
    let mut app = app(&["aaaaaaaaaaa"], tmp.path());
    app.button_areas[PadButton::Red.index()] = Some(Rect::new(0, 0, 10, 3));

    app.pointer_down(5, 1);
    assert!(app.panel.is_pressed(PadButton::Red));

    app.pointer_moved(50, 20);
    assert!(!app.panel.is_pressed(PadButton::Red));

    // The matching pointer-up after the implicit release is a harmless no-op.
    app.pointer_up();
    assert!(!app.panel.is_pressed(PadButton::Red));
  }
}
