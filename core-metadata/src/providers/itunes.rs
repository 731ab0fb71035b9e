//! iTunes Search API Client
//!
//! Public catalog search, no credentials. Each search variation is tried in
//! turn until one returns a result.
//!
//! ## API Endpoints
//!
//! - **Search**: `https://itunes.apple.com/search?term={term}&media=music&limit=3`
//!
//! ## Rate Limiting
//!
//! The search API answers 403 or 429 when called too often. The client then
//! waits for the configured delay before moving on to the next variation.
//!
//! Artwork URLs point at a 100x100 rendition; the size token in the URL is
//! rewritten to request 600x600 instead.

use super::{download_image, CoverProvider, ProviderKind, SEARCH_TIMEOUT};
use crate::error::{MetadataError, Result};
use crate::variations::generate_search_variations;
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const SEARCH_URL: &str = "https://itunes.apple.com/search";

/// Results requested per search
const MAX_SEARCH_RESULTS: u32 = 3;

const LOW_RES_TOKEN: &str = "100x100bb";
const HIGH_RES_TOKEN: &str = "600x600bb";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResult {
    #[serde(default)]
    artwork_url100: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// Outcome of searching a single term.
enum TermOutcome {
    /// The first result, possibly without artwork.
    Hit(Option<String>),
    Miss,
    Throttled,
}

/// iTunes cover lookup across all search variations.
pub struct ITunesProvider {
    http_client: Arc<dyn HttpClient>,
    user_agent: String,
    throttle_delay: Duration,
}

impl ITunesProvider {
    /// # Arguments
    ///
    /// * `throttle_delay` - pause after a 403/429 before the next variation
    pub fn new(http_client: Arc<dyn HttpClient>, user_agent: String, throttle_delay: Duration) -> Self {
        Self {
            http_client,
            user_agent,
            throttle_delay,
        }
    }

    /// Rewrite the 100x100 artwork URL to its 600x600 rendition.
    pub fn high_res_artwork_url(url: &str) -> String {
        url.replace(LOW_RES_TOKEN, HIGH_RES_TOKEN)
    }

    async fn search_term(&self, term: &str) -> Result<TermOutcome> {
        let url = format!(
            "{}?term={}&media=music&limit={}",
            SEARCH_URL,
            urlencoding::encode(term),
            MAX_SEARCH_RESULTS
        );

        debug!("Searching iTunes: {}", url);

        let request = HttpRequest::get(url)
            .header("User-Agent", &self.user_agent)
            .timeout(SEARCH_TIMEOUT);

        let response = self.http_client.execute(request).await.map_err(|e| {
            MetadataError::NetworkError(format!("iTunes search failed: {}", e))
        })?;

        if response.is_throttled() {
            return Ok(TermOutcome::Throttled);
        }
        if !response.is_success() {
            return Err(MetadataError::HttpError {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).to_string(),
            });
        }

        let search: SearchResponse = response
            .json()
            .map_err(|e| MetadataError::JsonParse(format!("Invalid iTunes search: {}", e)))?;

        Ok(match search.results.into_iter().next() {
            Some(first) => TermOutcome::Hit(first.artwork_url100),
            None => TermOutcome::Miss,
        })
    }
}

#[async_trait]
impl CoverProvider for ITunesProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ITunes
    }

    async fn fetch(&self, artist: &str, title: &str) -> Result<Option<Bytes>> {
        for term in generate_search_variations(artist, title) {
            match self.search_term(&term).await {
                Ok(TermOutcome::Hit(Some(artwork))) => {
                    let url = Self::high_res_artwork_url(&artwork);
                    debug!(term = %term, "iTunes match");
                    return Ok(download_image(self.http_client.as_ref(), &url, &self.user_agent).await);
                }
                Ok(TermOutcome::Hit(None)) => {
                    debug!(term = %term, "iTunes result without artwork");
                }
                Ok(TermOutcome::Miss) => {}
                Ok(TermOutcome::Throttled) => {
                    warn!(
                        delay_ms = self.throttle_delay.as_millis() as u64,
                        "iTunes throttled, backing off"
                    );
                    tokio::time::sleep(self.throttle_delay).await;
                }
                Err(e) => {
                    debug!(term = %term, error = %e, "iTunes search failed");
                }
            }
        }
        Ok(None)
    }
}
