use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Color, Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, Borders, List, ListItem, Padding, Paragraph},
};

use crate::app::{App, AppMode};
use crate::metadata::watch_url;
use crate::panel::PadButton;

// --- Helpers ---

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

/// Display width of a string (accounting for double-width CJK).
fn display_width(s: &str) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().map(|c| c.width().unwrap_or(0)).sum()
}

fn button_color(button: PadButton) -> Color {
  match button {
    PadButton::Red => Color::Red,
    PadButton::Blue => Color::Blue,
    PadButton::Yellow => Color::Yellow,
  }
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let [header_area, main_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(5),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);

  let [list_area, side_area] =
    Layout::horizontal([Constraint::Percentage(58), Constraint::Percentage(42)]).areas(main_area);
  let [playing_area, panel_area] = Layout::vertical([Constraint::Min(4), Constraint::Length(5)]).areas(side_area);

  render_list(frame, app, list_area);
  render_now_playing(frame, app, playing_area);
  render_panel(frame, app, panel_area);
  render_status(frame, app, status_area);
  render_input(frame, app, input_area);
  render_footer(frame, app, footer_area);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let mode = match app.mode {
    AppMode::Browse => "library",
    AppMode::Favorites => "favorites",
    AppMode::AddUrl => "add video",
  };
  let line = Line::from(vec![
    Span::styled(" ▶ tvcade ", Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)),
    Span::styled(format!("— {}", mode), Style::default().fg(Color::DarkGray)),
  ]);
  frame.render_widget(line, area);
}

fn render_list(frame: &mut Frame, app: &mut App, area: Rect) {
  let title = match app.mode {
    AppMode::Favorites => " Favorites ",
    _ => " Library ",
  };

  let entries: Vec<(String, String)> = match app.mode {
    AppMode::Favorites => app.library.favorites_view().iter().map(|v| (v.id.clone(), v.title.clone())).collect(),
    _ => app.library.videos().iter().map(|v| (v.id.clone(), v.title.clone())).collect(),
  };

  let width = area.width.saturating_sub(8) as usize;
  let items: Vec<ListItem> = entries
    .iter()
    .map(|(id, title)| {
      let mut spans = Vec::new();
      if app.library.current_id() == Some(id.as_str()) {
        spans.push(Span::styled("▶ ", Style::default().fg(Color::Green)));
      } else {
        spans.push(Span::raw("  "));
      }
      if app.library.is_favorite(id) {
        spans.push(Span::styled("★ ", Style::default().fg(Color::Yellow)));
      } else {
        spans.push(Span::raw("  "));
      }
      spans.push(Span::raw(truncate_str(title, width)));
      if !app.library.is_seed(id) {
        spans.push(Span::styled(" (added)", Style::default().fg(Color::DarkGray)));
      }
      ListItem::new(Line::from(spans))
    })
    .collect();

  let list = List::new(items)
    .block(Block::default().borders(Borders::ALL).title(title))
    .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

  if app.library.is_loading() && entries.is_empty() {
    let loading = Paragraph::new("Loading library…")
      .block(Block::default().borders(Borders::ALL).title(title))
      .alignment(Alignment::Center);
    frame.render_widget(loading, area);
  } else {
    frame.render_stateful_widget(list, area, &mut app.list_state);
  }
}

fn render_now_playing(frame: &mut Frame, app: &App, area: Rect) {
  let block = Block::default().borders(Borders::ALL).title(" Now Playing ").padding(Padding::horizontal(1));

  let lines = match app.library.current_id() {
    Some(id) => {
      // Selection can precede metadata; show the raw id until it arrives.
      let title = app.library.current_video().map(|v| v.title.clone()).unwrap_or_else(|| format!("{} (loading…)", id));
      vec![
        Line::from(Span::styled(title, Style::default().add_modifier(Modifier::BOLD))),
        Line::from(Span::styled(watch_url(id), Style::default().fg(Color::DarkGray))),
      ]
    }
    None => vec![Line::from(Span::styled("nothing selected", Style::default().fg(Color::DarkGray)))],
  };

  frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Draw the three arcade buttons and record their hitboxes for the mouse
/// handler.
fn render_panel(frame: &mut Frame, app: &mut App, area: Rect) {
  let areas: [Rect; 3] =
    Layout::horizontal([Constraint::Ratio(1, 3), Constraint::Ratio(1, 3), Constraint::Ratio(1, 3)]).areas(area);

  for button in PadButton::ALL {
    let button_area = areas[button.index()];
    app.button_areas[button.index()] = Some(button_area);

    let pressed = app.panel.is_pressed(button);
    let color = button_color(button);
    let style = if pressed {
      Style::default().fg(Color::Black).bg(color).add_modifier(Modifier::BOLD)
    } else {
      Style::default().fg(color)
    };
    let label = if pressed { format!("[{}]", button.label()) } else { button.label().to_string() };

    let widget = Paragraph::new(Line::from(Span::styled(label, style)))
      .alignment(Alignment::Center)
      .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(color)));
    frame.render_widget(widget, button_area);
  }
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let line = if let Some(ref err) = app.last_error {
    Line::from(Span::styled(format!(" ✖ {}", err), Style::default().fg(Color::Red)))
  } else if let Some(ref status) = app.status_message {
    Line::from(Span::styled(format!(" ⋯ {}", status), Style::default().fg(Color::Cyan)))
  } else {
    Line::from("")
  };
  frame.render_widget(line, area);
}

fn render_input(frame: &mut Frame, app: &App, area: Rect) {
  if app.mode == AppMode::AddUrl {
    let input = Paragraph::new(app.input.as_str())
      .block(Block::default().borders(Borders::ALL).title(" Video URL (Enter to add, Esc to cancel) "));
    frame.render_widget(input, area);
    let cursor_x = display_width(&app.input.chars().take(app.cursor_position).collect::<String>()) as u16;
    frame.set_cursor_position((area.x + 1 + cursor_x, area.y + 1));
  } else {
    let mut hints = vec!["a add by URL".to_string()];
    if app.library.is_user_videos_resettable() {
      hints.push("r reset added".to_string());
    }
    if app.library.is_favorites_resettable() {
      hints.push("d reset favorites".to_string());
    }
    let hint = Paragraph::new(hints.join("  ·  "))
      .style(Style::default().fg(Color::DarkGray))
      .block(Block::default().borders(Borders::ALL));
    frame.render_widget(hint, area);
  }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let keys = match app.mode {
    AppMode::AddUrl => " Enter add · Esc cancel ",
    AppMode::Favorites => " j/k move · Enter play · f unfavorite · Tab library · z/x/c buttons · q quit ",
    AppMode::Browse => " j/k move · Enter play · f favorite · l lucky · Tab favorites · z/x/c buttons · q quit ",
  };
  frame.render_widget(Line::from(keys).style(Style::default().fg(Color::DarkGray)).dim(), area);
}
