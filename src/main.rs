mod app;
mod audio;
mod config;
mod constants;
mod keys;
mod library;
mod metadata;
mod panel;
mod resolver;
mod store;
mod ui;

use anyhow::Result;
use clap::Parser;
use ratatui::{
  DefaultTerminal,
  crossterm::{
    event::{
      self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
      KeyboardEnhancementFlags, MouseButton, MouseEvent, MouseEventKind, PopKeyboardEnhancementFlags,
      PushKeyboardEnhancementFlags,
    },
    execute,
  },
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use app::{App, AppMode};
use audio::{AudioFeedback, Feedback, SilentFeedback, SwitchedFeedback};
use config::Config;
use constants::constants;
use library::Library;
use panel::ControlPanel;
use store::PrefStore;

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Disable audible button feedback entirely (the 'm' key only toggles the
  /// persisted preference)
  #[arg(short, long)]
  silent: bool,

  /// Override the data directory used for persisted favorites
  #[arg(long)]
  data_dir: Option<PathBuf>,
}

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

// --- Event Handling ---

fn handle_key_event(app: &mut App, feedback: &SwitchedFeedback, key: event::KeyEvent) {
  // Panel keys first: bound keys are consumed here (press, repeat, release)
  // unless the URL field has focus.
  let text_entry_focused = app.text_entry_focused();
  if keys::dispatch(&mut app.panel, &key, text_entry_focused) {
    return;
  }
  // App shortcuts only act on key-down.
  if key.kind != KeyEventKind::Press {
    return;
  }

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return;
  }

  match app.mode {
    AppMode::AddUrl => handle_add_url_key(app, key),
    AppMode::Browse | AppMode::Favorites => handle_list_key(app, feedback, key),
  }
}

fn handle_list_key(app: &mut App, feedback: &SwitchedFeedback, key: event::KeyEvent) {
  match key.code {
    KeyCode::Char('q') => {
      app.should_quit = true;
    }
    KeyCode::Down | KeyCode::Char('j') => {
      app.move_selection(true);
    }
    KeyCode::Up | KeyCode::Char('k') => {
      app.move_selection(false);
    }
    KeyCode::Enter => {
      app.select_highlighted();
    }
    KeyCode::Char('f') => {
      app.toggle_favorite_highlighted();
    }
    KeyCode::Char('a') => {
      app.clear_error();
      app.set_mode(AppMode::AddUrl);
    }
    KeyCode::Char('l') => {
      app.library.pick_different();
    }
    KeyCode::Char('r') => {
      if app.library.is_user_videos_resettable() {
        app.library.reset_user_videos();
        app.clamp_selection();
      }
    }
    KeyCode::Char('d') => {
      if app.library.is_favorites_resettable() {
        app.library.reset_favorites();
        app.clamp_selection();
      }
    }
    KeyCode::Char('m') => {
      let sound_on = feedback.toggle();
      Config { sound: Some(sound_on) }.save();
    }
    KeyCode::Tab => {
      let next = if app.mode == AppMode::Favorites { AppMode::Browse } else { AppMode::Favorites };
      app.set_mode(next);
    }
    KeyCode::Esc => {
      if app.mode == AppMode::Favorites {
        app.set_mode(AppMode::Browse);
      } else {
        app.should_quit = true;
      }
    }
    _ => {}
  }
}

fn handle_add_url_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter => {
      app.trigger_add();
    }
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
      app.input.insert(byte_idx, c);
      app.cursor_position += 1;
    }
    KeyCode::Backspace => {
      if app.cursor_position > 0 {
        app.cursor_position -= 1;
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
      }
    }
    KeyCode::Delete => {
      if app.cursor_position < app.input.chars().count() {
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
      }
    }
    KeyCode::Left => {
      app.cursor_position = app.cursor_position.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.cursor_position < app.input.chars().count() {
        app.cursor_position += 1;
      }
    }
    KeyCode::Home => {
      app.cursor_position = 0;
    }
    KeyCode::End => {
      app.cursor_position = app.input.chars().count();
    }
    KeyCode::Esc => {
      app.input.clear();
      app.cursor_position = 0;
      app.clear_error();
      app.set_mode(AppMode::Browse);
    }
    _ => {}
  }
}

fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
  match mouse.kind {
    MouseEventKind::Down(MouseButton::Left) => app.pointer_down(mouse.column, mouse.row),
    MouseEventKind::Up(MouseButton::Left) => app.pointer_up(),
    MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => app.pointer_moved(mouse.column, mouse.row),
    _ => {}
  }
}

// --- Logging ---

fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
  let dirs = directories::ProjectDirs::from("", "", "tvcade")?;
  let log_dir = dirs.data_dir().join("logs");
  std::fs::create_dir_all(&log_dir).ok()?;
  let appender = tracing_appender::rolling::daily(log_dir, "tvcade.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tvcade=info")))
    .with_writer(writer)
    .with_ansi(false)
    .init();
  Some(guard)
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let _log_guard = init_tracing();

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  // Key-release reporting is required for momentary buttons; mouse capture
  // for the on-screen panel. Both degrade gracefully where unsupported.
  let _ = execute!(
    std::io::stdout(),
    EnableMouseCapture,
    PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
  );
  let result = run(&mut terminal, args).await;
  let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags, DisableMouseCapture);
  ratatui::restore();
  result
}

async fn run(terminal: &mut DefaultTerminal, args: Args) -> Result<()> {
  let config = Config::load();
  let inner: Arc<dyn Feedback> =
    if args.silent { Arc::new(SilentFeedback) } else { Arc::new(AudioFeedback::spawn()) };
  let feedback = SwitchedFeedback::new(inner, config.sound.unwrap_or(true));

  let store = match args.data_dir {
    Some(dir) => PrefStore::at(dir),
    None => PrefStore::open(),
  };
  let library = Library::new(&constants().seed_video_ids, store);
  let mut app = App::new(library, ControlPanel::new(feedback.clone()));
  app.trigger_load_seed();

  loop {
    app.check_pending();
    app.expire_error();

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    if event::poll(Duration::from_millis(30))? {
      match event::read()? {
        Event::Key(key) => handle_key_event(&mut app, &feedback, key),
        Event::Mouse(mouse) => handle_mouse_event(&mut app, mouse),
        // Held keys never report their release once focus is gone.
        Event::FocusLost => app.panel.release_all(),
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  app.panel.release_all();
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  // --- char_to_byte_index ---

  #[test]
  fn char_to_byte_ascii() {
    assert_eq!(char_to_byte_index("hello", 0), 0);
    assert_eq!(char_to_byte_index("hello", 3), 3);
    assert_eq!(char_to_byte_index("hello", 5), 5); // past end
  }

  #[test]
  fn char_to_byte_multibyte() {
    let s = "aé日"; // a=1 byte, é=2 bytes, 日=3 bytes
    assert_eq!(char_to_byte_index(s, 0), 0);
    assert_eq!(char_to_byte_index(s, 1), 1);
    assert_eq!(char_to_byte_index(s, 2), 3);
    assert_eq!(char_to_byte_index(s, 3), 6); // past end
  }

  #[test]
  fn char_to_byte_empty() {
    assert_eq!(char_to_byte_index("", 0), 0);
    assert_eq!(char_to_byte_index("", 5), 0);
  }
}
