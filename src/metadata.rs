use futures::future;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::constants::constants;

/// A single library entry. Identity is `id` (case-sensitive string equality).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Video {
  pub id: String,
  pub title: String,
  pub thumbnail_url: String,
}

/// The metadata service could not be reached at all. Response-level problems
/// (error status, error payload, missing fields) never produce this — they
/// degrade to [`fallback_video`] instead.
#[derive(Debug, Clone, Error)]
#[error("metadata service unreachable: {0}")]
pub struct MetadataError(String);

/// oEmbed response shape. Either field may be absent, and the service reports
/// some failures as a success response carrying an `error` payload.
#[derive(Debug, Deserialize)]
struct OembedResponse {
  title: Option<String>,
  thumbnail_url: Option<String>,
  error: Option<serde_json::Value>,
}

/// Canonical watch URL for an id — the form the metadata service expects and
/// the one handed to the player surface.
pub fn watch_url(id: &str) -> String {
  format!("{}{}", constants().watch_url_prefix, id)
}

/// Deterministic substitute metadata: the title encodes the raw id and the
/// thumbnail comes from a fixed template, so an unreachable service still
/// yields a usable entry.
pub fn fallback_video(id: &str) -> Video {
  Video {
    id: id.to_string(),
    title: format!("Video {}", id),
    thumbnail_url: constants().fallback_thumb_template.replace("{id}", id),
  }
}

/// Look up display metadata for one id.
///
/// Returns `Err` only when the request itself could not be completed
/// (connect failure, timeout). Every response-level failure falls back to
/// [`fallback_video`], so callers holding a response always get a `Video`.
pub async fn fetch_one(client: &Client, id: &str) -> Result<Video, MetadataError> {
  let url = watch_url(id);
  let response = client
    .get(&constants().oembed_endpoint)
    .query(&[("url", url.as_str()), ("format", "json")])
    .timeout(Duration::from_secs(constants().request_timeout_secs))
    .send()
    .await
    .map_err(|e| MetadataError(e.to_string()))?;

  if !response.status().is_success() {
    debug!(id, status = %response.status(), "metadata lookup returned error status, using fallback");
    return Ok(fallback_video(id));
  }

  let body: OembedResponse = match response.json().await {
    Ok(body) => body,
    Err(e) => {
      warn!(id, err = %e, "metadata response body unreadable, using fallback");
      return Ok(fallback_video(id));
    }
  };

  if body.error.is_some() {
    debug!(id, "metadata service reported an error payload, using fallback");
    return Ok(fallback_video(id));
  }

  match (body.title, body.thumbnail_url) {
    (Some(title), Some(thumbnail_url)) => Ok(Video { id: id.to_string(), title, thumbnail_url }),
    _ => Ok(fallback_video(id)),
  }
}

/// Look up metadata for many ids concurrently.
///
/// The result has the same length and order as `ids`; each lookup that fails
/// for any reason (including transport) is replaced by its fallback, so the
/// aggregate call never fails because of one id.
pub async fn fetch_many(client: &Client, ids: &[String]) -> Vec<Video> {
  let lookups = ids.iter().map(|id| async move {
    match fetch_one(client, id).await {
      Ok(video) => video,
      Err(e) => {
        warn!(id, err = %e, "metadata lookup unreachable, using fallback");
        fallback_video(id)
      }
    }
  });
  future::join_all(lookups).await
}
