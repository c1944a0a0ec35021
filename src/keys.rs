//! Keyboard-to-panel dispatch: six physical keys (two case variants per
//! logical button) map onto the three arcade buttons.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::panel::{ControlPanel, PadButton, PanelEvent};

/// The fixed key map. Both case variants are bound so a held Shift never
/// changes which button a key drives.
pub fn binding(code: KeyCode) -> Option<PadButton> {
  match code {
    KeyCode::Char('z') | KeyCode::Char('Z') => Some(PadButton::Red),
    KeyCode::Char('x') | KeyCode::Char('X') => Some(PadButton::Blue),
    KeyCode::Char('c') | KeyCode::Char('C') => Some(PadButton::Yellow),
    _ => None,
  }
}

/// Route a keyboard event to the panel. Returns `true` when the event was
/// consumed (so it never doubles as text input or an app shortcut).
///
/// Key-down is ignored while a text-entry field has focus — typing a URL
/// must never fire a button. Key-up is forwarded unconditionally: if focus
/// moved to the text field while a key was held, the release still has to
/// land or the button would stay stuck pressed.
pub fn dispatch(panel: &mut ControlPanel, key: &KeyEvent, text_entry_focused: bool) -> bool {
  let Some(button) = binding(key.code) else { return false };

  match key.kind {
    KeyEventKind::Press | KeyEventKind::Repeat => {
      if text_entry_focused {
        return false;
      }
      // Terminal auto-repeat is not a new press; the held state already
      // drives the repeating click timer.
      if key.kind == KeyEventKind::Press {
        panel.apply(PanelEvent::Press(button));
      }
      true
    }
    KeyEventKind::Release => {
      panel.apply(PanelEvent::Release(button));
      true
    }
  }
}
