//! Spotify Web API Client
//!
//! Token-auth catalog search. A client-credentials token is exchanged once
//! per run by [`SpotifyTokenClient`] and captured by [`SpotifyProvider`].
//!
//! ## API Endpoints
//!
//! - **Token**: `POST https://accounts.spotify.com/api/token` (Basic auth, `grant_type=client_credentials`)
//! - **Search**: `https://api.spotify.com/v1/search?q=track:{title} artist:{artist}&type=track&limit=1`
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::providers::spotify::{SpotifyProvider, SpotifyTokenClient};
//!
//! let tokens = SpotifyTokenClient::new(http_client.clone(), user_agent.clone());
//! if let Some(token) = tokens.fetch_token(&client_id, &client_secret).await {
//!     let spotify = SpotifyProvider::new(http_client, user_agent, token);
//!     let cover = spotify.fetch("DJ Nova", "Midnight Drive").await?;
//! }
//! ```

use super::{download_image, CoverProvider, ProviderKind, REQUEST_TIMEOUT};
use crate::error::{MetadataError, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SEARCH_URL: &str = "https://api.spotify.com/v1/search";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    tracks: Option<TrackPage>,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<Track>,
}

#[derive(Debug, Deserialize)]
struct Track {
    album: Album,
}

#[derive(Debug, Deserialize)]
struct Album {
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
struct Image {
    url: String,
}

/// Performs the client-credentials token exchange.
pub struct SpotifyTokenClient {
    http_client: Arc<dyn HttpClient>,
    user_agent: String,
}

impl SpotifyTokenClient {
    pub fn new(http_client: Arc<dyn HttpClient>, user_agent: String) -> Self {
        Self {
            http_client,
            user_agent,
        }
    }

    /// Exchange client credentials for an access token.
    ///
    /// Any failure (blank credentials, network, status, parse) yields `None`
    /// and a warning; the run continues without Spotify.
    pub async fn fetch_token(&self, client_id: &str, client_secret: &str) -> Option<String> {
        match self.request_token(client_id, client_secret).await {
            Ok(token) => {
                info!("Obtained Spotify access token");
                Some(token)
            }
            Err(e) => {
                warn!(error = %e, "Spotify token exchange failed");
                None
            }
        }
    }

    async fn request_token(&self, client_id: &str, client_secret: &str) -> Result<String> {
        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return Err(MetadataError::ConfigurationError(
                "Spotify client id and secret are required".to_string(),
            ));
        }

        let credentials = STANDARD.encode(format!("{}:{}", client_id, client_secret));
        let form = serde_urlencoded::to_string([("grant_type", "client_credentials")])
            .map_err(|e| MetadataError::ConfigurationError(e.to_string()))?;

        let request = HttpRequest::new(HttpMethod::Post, TOKEN_URL)
            .header("Authorization", format!("Basic {}", credentials))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("User-Agent", &self.user_agent)
            .body(Bytes::from(form))
            .timeout(REQUEST_TIMEOUT);

        let response = self.http_client.execute(request).await.map_err(|e| {
            MetadataError::NetworkError(format!("Spotify token request failed: {}", e))
        })?;

        if !response.is_success() {
            return Err(MetadataError::HttpError {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).to_string(),
            });
        }

        let token: TokenResponse = response
            .json()
            .map_err(|e| MetadataError::JsonParse(format!("Invalid token response: {}", e)))?;

        if token.access_token.is_empty() {
            return Err(MetadataError::JsonParse("Empty access token".to_string()));
        }
        Ok(token.access_token)
    }
}

/// Spotify cover lookup using a per-run bearer token.
pub struct SpotifyProvider {
    http_client: Arc<dyn HttpClient>,
    user_agent: String,
    token: String,
}

impl SpotifyProvider {
    pub fn new(http_client: Arc<dyn HttpClient>, user_agent: String, token: String) -> Self {
        Self {
            http_client,
            user_agent,
            token,
        }
    }

    /// First album image URL of the best matching track.
    async fn search_image_url(&self, artist: &str, title: &str) -> Result<Option<String>> {
        let query = format!("track:{} artist:{}", title, artist);
        let url = format!(
            "{}?q={}&type=track&limit=1",
            SEARCH_URL,
            urlencoding::encode(&query)
        );

        debug!("Searching Spotify: {}", url);

        let request = HttpRequest::get(url)
            .bearer_token(&self.token)
            .header("User-Agent", &self.user_agent)
            .timeout(REQUEST_TIMEOUT);

        let response = self.http_client.execute(request).await.map_err(|e| {
            MetadataError::NetworkError(format!("Spotify search failed: {}", e))
        })?;

        if !response.is_success() {
            return Err(MetadataError::HttpError {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).to_string(),
            });
        }

        let search: SearchResponse = response
            .json()
            .map_err(|e| MetadataError::JsonParse(format!("Invalid Spotify search: {}", e)))?;

        Ok(search
            .tracks
            .and_then(|page| page.items.into_iter().next())
            .and_then(|track| track.album.images.into_iter().next())
            .map(|image| image.url))
    }
}

#[async_trait]
impl CoverProvider for SpotifyProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Spotify
    }

    async fn fetch(&self, artist: &str, title: &str) -> Result<Option<Bytes>> {
        if self.token.is_empty() {
            return Err(MetadataError::ConfigurationError(
                "Spotify access token is missing".to_string(),
            ));
        }

        match self.search_image_url(artist, title).await {
            Ok(Some(url)) => Ok(download_image(self.http_client.as_ref(), &url, &self.user_agent).await),
            Ok(None) => {
                debug!("No Spotify match for '{} - {}'", artist, title);
                Ok(None)
            }
            Err(e) => {
                debug!(error = %e, "Spotify lookup failed");
                Ok(None)
            }
        }
    }
}
