//! MusicBrainz API Client
//!
//! Provides integration with the MusicBrainz API and Cover Art Archive for fetching cover art.
//!
//! ## API Endpoints
//!
//! - **Search**: `https://musicbrainz.org/ws/2/recording?query={query}&fmt=json&limit=1`
//! - **Cover Art**: `https://coverartarchive.org/release/{mbid}/front`
//!
//! ## User Agent Requirement
//!
//! MusicBrainz requires all API clients to identify themselves with a proper User-Agent header:
//! Format: "ApplicationName/Version (ContactEmail)"
//! Example: "coverfetch/0.1.0 (contact@example.com)"
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::providers::musicbrainz::MusicBrainzProvider;
//!
//! let provider = MusicBrainzProvider::new(http_client, "coverfetch/0.1.0".to_string());
//! let artwork = provider.fetch("Daft Punk", "Aerodynamic").await?;
//! ```

use super::{CoverProvider, ProviderKind, REQUEST_TIMEOUT};
use crate::error::{MetadataError, Result};
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// MusicBrainz API base URL
const MUSICBRAINZ_API_BASE: &str = "https://musicbrainz.org/ws/2";

/// Cover Art Archive base URL
const COVERART_ARCHIVE_BASE: &str = "https://coverartarchive.org";

#[derive(Debug, Deserialize)]
struct Release {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Recording {
    #[serde(default)]
    releases: Vec<Release>,
}

/// MusicBrainz recording search response
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    recordings: Vec<Recording>,
}

/// Cover lookup through a recording search and the Cover Art Archive.
pub struct MusicBrainzProvider {
    http_client: Arc<dyn HttpClient>,
    user_agent: String,
}

impl MusicBrainzProvider {
    /// Creates a new MusicBrainz provider
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client for making requests
    /// * `user_agent` - User agent string (format: "AppName/Version (Contact)")
    pub fn new(http_client: Arc<dyn HttpClient>, user_agent: String) -> Self {
        Self {
            http_client,
            user_agent,
        }
    }

    /// Searches recordings and returns the first release ID of the best match
    ///
    /// # Returns
    ///
    /// - `Ok(Some(String))` - MusicBrainz release ID
    /// - `Ok(None)` - No matching recording, or it has no releases
    /// - `Err` - API error
    async fn search_release(&self, artist: &str, title: &str) -> Result<Option<String>> {
        let query = format!("{} {}", artist, title);
        let url = format!(
            "{}/recording?query={}&fmt=json&limit=1",
            MUSICBRAINZ_API_BASE,
            urlencoding::encode(query.trim())
        );

        debug!("Searching MusicBrainz: {}", url);

        let request = HttpRequest::get(url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT);

        let response = self.http_client.execute(request).await.map_err(|e| {
            MetadataError::NetworkError(format!("MusicBrainz search failed: {}", e))
        })?;

        if !response.is_success() {
            if response.status == 503 {
                // Service unavailable - rate limited or maintenance
                warn!("MusicBrainz service unavailable (503)");
                return Ok(None);
            }

            return Err(MetadataError::HttpError {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).to_string(),
            });
        }

        let search_result: SearchResponse = serde_json::from_slice(&response.body).map_err(|e| {
            MetadataError::JsonParse(format!("Failed to parse search results: {}", e))
        })?;

        Ok(search_result
            .recordings
            .into_iter()
            .next()
            .and_then(|recording| recording.releases.into_iter().next())
            .map(|release| release.id))
    }

    /// Fetches the front cover of a release from the Cover Art Archive
    ///
    /// Only a 200 counts; 404, 5xx and everything else mean "no cover".
    async fn fetch_front_cover(&self, release_id: &str) -> Result<Option<Bytes>> {
        let url = format!("{}/release/{}/front", COVERART_ARCHIVE_BASE, release_id);

        debug!("Fetching cover art: {}", url);

        let request = HttpRequest::get(url)
            .header("User-Agent", &self.user_agent)
            .timeout(REQUEST_TIMEOUT);

        let response = self.http_client.execute(request).await.map_err(|e| {
            MetadataError::NetworkError(format!("Cover art fetch failed: {}", e))
        })?;

        let status = response.status;
        match status {
            200 if !response.body.is_empty() => Ok(Some(response.body)),
            404 => {
                debug!("No cover art available for release {}", release_id);
                Ok(None)
            }
            _ => {
                debug!(status, "Cover Art Archive returned no image");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl CoverProvider for MusicBrainzProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::MusicBrainz
    }

    async fn fetch(&self, artist: &str, title: &str) -> Result<Option<Bytes>> {
        let release_id = match self.search_release(artist, title).await {
            Ok(Some(id)) => {
                info!("Found release {} for '{} - {}'", id, artist, title);
                id
            }
            Ok(None) => {
                debug!("No release found for '{} - {}' on MusicBrainz", artist, title);
                return Ok(None);
            }
            Err(e) => {
                debug!(error = %e, "MusicBrainz search failed");
                return Ok(None);
            }
        };

        match self.fetch_front_cover(&release_id).await {
            Ok(image) => Ok(image),
            Err(e) => {
                debug!(error = %e, "Cover Art Archive request failed");
                Ok(None)
            }
        }
    }
}
