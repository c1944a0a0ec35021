use thiserror::Error;

use crate::constants::constants;

/// The supplied text did not contain a recognizable video reference.
/// Nothing is mutated when this is returned — the caller surfaces it as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no video reference recognized")]
pub struct InvalidReference;

/// URL shapes we accept, in match order. The marker is searched anywhere in
/// the input so scheme and `www.` prefixes don't matter.
const URL_MARKERS: [&str; 3] = ["youtube.com/watch?v=", "youtu.be/", "youtube.com/embed/"];

/// Extract an 11-character video id (`[A-Za-z0-9_-]`) from free-form text.
///
/// Recognizes the canonical watch URL, the short-link domain, and the embed
/// path. The id is returned unvalidated against the remote service —
/// existence is not checked here.
pub fn resolve_video_id(text: &str) -> Result<String, InvalidReference> {
  let trimmed = text.trim();

  let rest = URL_MARKERS
    .iter()
    .find_map(|marker| trimmed.find(marker).map(|i| &trimmed[i + marker.len()..]))
    .ok_or(InvalidReference)?;

  let id: String = rest.chars().take_while(|c| is_id_char(*c)).collect();
  if id.len() == constants().video_id_len { Ok(id) } else { Err(InvalidReference) }
}

fn is_id_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn resolves_short_link() {
    assert_eq!(resolve_video_id("https://youtu.be/abcdefghijk"), Ok("abcdefghijk".to_string()));
  }

  #[test]
  fn resolves_watch_url() {
    assert_eq!(resolve_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), Ok("dQw4w9WgXcQ".to_string()));
  }

  #[test]
  fn resolves_embed_url() {
    assert_eq!(resolve_video_id("https://www.youtube.com/embed/kJQP7kiw5Fk"), Ok("kJQP7kiw5Fk".to_string()));
  }

  #[test]
  fn resolves_with_trailing_query() {
    assert_eq!(resolve_video_id("https://youtu.be/abcdefghijk?t=42"), Ok("abcdefghijk".to_string()));
    assert_eq!(resolve_video_id("https://www.youtube.com/watch?v=abc_def-hij&list=PL123"), Ok("abc_def-hij".to_string()));
  }

  #[test]
  fn resolves_with_surrounding_whitespace() {
    assert_eq!(resolve_video_id("  https://youtu.be/abcdefghijk  "), Ok("abcdefghijk".to_string()));
  }

  #[test]
  fn rejects_plain_text() {
    assert_eq!(resolve_video_id("not a url"), Err(InvalidReference));
  }

  #[test]
  fn rejects_wrong_length_id() {
    assert_eq!(resolve_video_id("https://youtu.be/short"), Err(InvalidReference));
    assert_eq!(resolve_video_id("https://youtu.be/waytoolongid0"), Err(InvalidReference));
  }

  #[test]
  fn rejects_empty_and_bare_domain() {
    assert_eq!(resolve_video_id(""), Err(InvalidReference));
    assert_eq!(resolve_video_id("https://www.youtube.com/"), Err(InvalidReference));
  }
}
