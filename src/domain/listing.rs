use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app::{AdlogError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: i64,
    pub url: String,
    pub title: String,
    /// Path relative to the media root, e.g. `listings/<id>.jpg`
    pub image_path: Option<String>,
    pub view_count: u64,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    pub fn image_url(&self, prefix: &str) -> Option<String> {
        self.image_path.as_deref().and_then(|p| media_url(prefix, p))
    }
}

/// A page of listings together with the total number stored.
#[derive(Debug, Clone, Serialize)]
pub struct ListingPage {
    pub items: Vec<Listing>,
    pub total: u64,
}

/// Canonical form of a listing URL, used as the deduplication key.
///
/// Scheme and host are lowercased and the fragment is dropped; path and
/// query are kept as given.
pub fn normalize_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AdlogError::InvalidInput("URL is empty".into()));
    }

    let mut url = Url::parse(trimmed)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AdlogError::InvalidInput(format!(
            "unsupported scheme: {}",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(AdlogError::InvalidInput(format!("missing host: {}", trimmed)));
    }

    url.set_fragment(None);
    Ok(url.to_string())
}

/// Join a public media prefix with a storage-relative path.
pub fn media_url(prefix: &str, relative_path: &str) -> Option<String> {
    let path = relative_path.trim_start_matches('/');
    if path.is_empty() {
        return None;
    }
    Some(format!("{}/{}", prefix.trim_end_matches('/'), path))
}
