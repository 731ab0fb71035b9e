//! Discogs Database Client
//!
//! Marketplace database search. Requires a personal access token, so the
//! provider is only built when one is configured.
//!
//! ## API Endpoints
//!
//! - **Search**: `https://api.discogs.com/database/search?q={query}&type=release`
//!
//! The token is sent as `Authorization: Discogs token={token}` so it never
//! appears in a URL. The first result carrying a `cover_image` is downloaded.

use super::{download_image, CoverProvider, ProviderKind, REQUEST_TIMEOUT};
use crate::error::{MetadataError, Result};
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

const SEARCH_URL: &str = "https://api.discogs.com/database/search";

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    cover_image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// Discogs cover lookup authenticated with a personal token.
pub struct DiscogsProvider {
    http_client: Arc<dyn HttpClient>,
    user_agent: String,
    token: String,
}

impl DiscogsProvider {
    pub fn new(http_client: Arc<dyn HttpClient>, user_agent: String, token: String) -> Self {
        Self {
            http_client,
            user_agent,
            token,
        }
    }

    async fn search_cover_url(&self, artist: &str, title: &str) -> Result<Option<String>> {
        let query = format!("{} {}", artist, title);
        let encoded_query = urlencoding::encode(query.trim());

        let url = format!("{}?q={}&type=release", SEARCH_URL, encoded_query);
        debug!("Searching Discogs: {}", url);

        let request = HttpRequest::get(url)
            .header("User-Agent", &self.user_agent)
            .header("Authorization", format!("Discogs token={}", self.token))
            .timeout(REQUEST_TIMEOUT);

        let response = self.http_client.execute(request).await.map_err(|e| {
            MetadataError::NetworkError(format!("Discogs search failed: {}", e))
        })?;

        if !response.is_success() {
            return Err(MetadataError::HttpError {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).to_string(),
            });
        }

        let search: SearchResponse = response
            .json()
            .map_err(|e| MetadataError::JsonParse(format!("Invalid Discogs search: {}", e)))?;

        Ok(search
            .results
            .into_iter()
            .filter_map(|result| result.cover_image)
            .find(|url| !url.is_empty()))
    }
}

#[async_trait]
impl CoverProvider for DiscogsProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Discogs
    }

    async fn fetch(&self, artist: &str, title: &str) -> Result<Option<Bytes>> {
        match self.search_cover_url(artist, title).await {
            Ok(Some(url)) => Ok(download_image(self.http_client.as_ref(), &url, &self.user_agent).await),
            Ok(None) => {
                debug!("No Discogs cover for '{} - {}'", artist, title);
                Ok(None)
            }
            Err(e) => {
                debug!(error = %e, "Discogs lookup failed");
                Ok(None)
            }
        }
    }
}
