//! External Cover Providers
//!
//! Adapters for the services queried for cover art, in priority order:
//! - Spotify - token-auth catalog (client-credentials flow)
//! - iTunes - public catalog search, tried once per search variation
//! - MusicBrainz - open bibliographic database plus the Cover Art Archive
//! - Discogs - marketplace database, personal token required
//!
//! Every adapter answers `Ok(None)` for "not found" and for any network,
//! status or parse failure, so the fetcher can simply move down the chain.

pub mod discogs;
pub mod itunes;
pub mod musicbrainz;
pub mod spotify;

pub use discogs::DiscogsProvider;
pub use itunes::ITunesProvider;
pub use musicbrainz::MusicBrainzProvider;
pub use spotify::{SpotifyProvider, SpotifyTokenClient};

use crate::error::{MetadataError, Result};
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use bytes::Bytes;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Timeout for public catalog searches
pub(crate) const SEARCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for every other provider request
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(7);

/// The supported providers, declared in chain priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProviderKind {
    Spotify,
    ITunes,
    MusicBrainz,
    Discogs,
}

impl ProviderKind {
    /// All providers, highest priority first.
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Spotify,
        ProviderKind::ITunes,
        ProviderKind::MusicBrainz,
        ProviderKind::Discogs,
    ];

    /// Human-readable name used in logs
    pub fn display_name(self) -> &'static str {
        match self {
            ProviderKind::Spotify => "Spotify",
            ProviderKind::ITunes => "iTunes",
            ProviderKind::MusicBrainz => "MusicBrainz",
            ProviderKind::Discogs => "Discogs",
        }
    }

    /// Lowercase name accepted on the command line
    pub fn cli_name(self) -> &'static str {
        match self {
            ProviderKind::Spotify => "spotify",
            ProviderKind::ITunes => "itunes",
            ProviderKind::MusicBrainz => "musicbrainz",
            ProviderKind::Discogs => "discogs",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ProviderKind {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.cli_name() == wanted)
            .ok_or_else(|| {
                MetadataError::ConfigurationError(format!(
                    "Unknown provider '{}' (expected one of: spotify, itunes, musicbrainz, discogs)",
                    s
                ))
            })
    }
}

/// A source of cover art for an `(artist, title)` pair.
///
/// # Returns
///
/// - `Ok(Some(Bytes))` - image data
/// - `Ok(None)` - nothing found, or the service failed
/// - `Err` - the adapter is misconfigured
#[async_trait]
pub trait CoverProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn fetch(&self, artist: &str, title: &str) -> Result<Option<Bytes>>;
}

/// Download an image; only a 2xx response with a non-empty body counts.
pub(crate) async fn download_image(
    http_client: &dyn HttpClient,
    url: &str,
    user_agent: &str,
) -> Option<Bytes> {
    let request = HttpRequest::get(url)
        .header("User-Agent", user_agent)
        .timeout(REQUEST_TIMEOUT);

    match http_client.execute(request).await {
        Ok(response) if response.is_success() && !response.body.is_empty() => {
            Some(response.body)
        }
        Ok(response) => {
            debug!(status = response.status, "Image download returned no data");
            None
        }
        Err(e) => {
            debug!(error = %e, "Image download failed");
            None
        }
    }
}
