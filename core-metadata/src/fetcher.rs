//! Cover Fetch Orchestration
//!
//! Walks the provider chain in priority order and stops at the first image.
//! The chain is assembled once per run from the configured credentials:
//!
//! | Provider    | Active when                                         |
//! |-------------|-----------------------------------------------------|
//! | Spotify     | client id and secret set, token exchange succeeded  |
//! | iTunes      | always                                              |
//! | MusicBrainz | always                                              |
//! | Discogs     | token set                                           |

use crate::error::Result;
use crate::providers::{
    CoverProvider, DiscogsProvider, ITunesProvider, MusicBrainzProvider, ProviderKind,
    SpotifyProvider, SpotifyTokenClient,
};
use crate::variations::generate_search_variations;
use bridge_traits::http::HttpClient;
use bytes::Bytes;
use core_runtime::logging::redact_if_sensitive;
use core_runtime::{ProviderCredentials, RunOptions};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Settings shared by the adapters of one run.
#[derive(Debug, Clone)]
pub struct FetcherOptions {
    /// Back-off after a provider throttles us
    pub request_delay: Duration,
    pub user_agent: String,
    /// Restrict the chain to a single provider
    pub provider_filter: Option<ProviderKind>,
}

impl Default for FetcherOptions {
    fn default() -> Self {
        Self::from(&RunOptions::default())
    }
}

impl From<&RunOptions> for FetcherOptions {
    fn from(options: &RunOptions) -> Self {
        Self {
            request_delay: options.request_delay(),
            user_agent: options.user_agent.clone(),
            provider_filter: None,
        }
    }
}

impl FetcherOptions {
    pub fn with_provider_filter(mut self, kind: Option<ProviderKind>) -> Self {
        self.provider_filter = kind;
        self
    }

    fn allows(&self, kind: ProviderKind) -> bool {
        self.provider_filter.map_or(true, |only| only == kind)
    }
}

/// Result of walking the provider chain for one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverResolution {
    Found { provider: ProviderKind, image: Bytes },
    /// No provider had an image; carries what was searched for.
    Unresolved { variations: Vec<String> },
}

/// Ordered provider chain.
pub struct CoverFetcher {
    providers: Vec<Box<dyn CoverProvider>>,
}

impl CoverFetcher {
    /// Use `providers` as given, highest priority first.
    pub fn new(providers: Vec<Box<dyn CoverProvider>>) -> Self {
        Self { providers }
    }

    /// Assemble the chain for a run.
    ///
    /// Missing credentials or a failed Spotify token exchange exclude the
    /// affected provider with a warning; this never fails.
    pub async fn from_credentials(
        http_client: Arc<dyn HttpClient>,
        credentials: &ProviderCredentials,
        options: &FetcherOptions,
    ) -> Self {
        let mut providers: Vec<Box<dyn CoverProvider>> = Vec::new();

        if options.allows(ProviderKind::Spotify) {
            match (
                credentials.spotify_client_id.as_deref(),
                credentials.spotify_client_secret.as_deref(),
            ) {
                (Some(client_id), Some(client_secret)) if credentials.has_spotify() => {
                    let tokens =
                        SpotifyTokenClient::new(Arc::clone(&http_client), options.user_agent.clone());
                    match tokens.fetch_token(client_id, client_secret).await {
                        Some(token) => {
                            debug!(
                                access_token = %redact_if_sensitive("access_token", &token),
                                "Spotify token acquired"
                            );
                            providers.push(Box::new(SpotifyProvider::new(
                                Arc::clone(&http_client),
                                options.user_agent.clone(),
                                token,
                            )));
                        }
                        None => warn!("Spotify disabled for this run: token exchange failed"),
                    }
                }
                _ => warn!("Spotify disabled: SPOTIFY_CLIENT_ID / SPOTIFY_CLIENT_SECRET not set"),
            }
        }

        if options.allows(ProviderKind::ITunes) {
            providers.push(Box::new(ITunesProvider::new(
                Arc::clone(&http_client),
                options.user_agent.clone(),
                options.request_delay,
            )));
        }

        if options.allows(ProviderKind::MusicBrainz) {
            providers.push(Box::new(MusicBrainzProvider::new(
                Arc::clone(&http_client),
                options.user_agent.clone(),
            )));
        }

        if options.allows(ProviderKind::Discogs) {
            match credentials.discogs_token.as_deref() {
                Some(token) if credentials.has_discogs() => {
                    providers.push(Box::new(DiscogsProvider::new(
                        Arc::clone(&http_client),
                        options.user_agent.clone(),
                        token.to_string(),
                    )))
                }
                _ => warn!("Discogs disabled: DISCOGS_TOKEN not set"),
            }
        }

        let fetcher = Self::new(providers);
        info!(
            providers = ?fetcher.active_providers(),
            "Cover provider chain ready"
        );
        fetcher
    }

    /// Active providers in the order they are queried.
    pub fn active_providers(&self) -> Vec<ProviderKind> {
        self.providers.iter().map(|p| p.kind()).collect()
    }

    /// Query providers in order; the first image wins.
    ///
    /// Later providers are not contacted once one succeeds. Adapter errors
    /// count as "nothing found".
    pub async fn resolve_cover(&self, artist: &str, title: &str) -> CoverResolution {
        for provider in &self.providers {
            let kind = provider.kind();
            match provider.fetch(artist, title).await {
                Ok(Some(image)) => {
                    info!(provider = %kind, bytes = image.len(), "Cover found");
                    return CoverResolution::Found {
                        provider: kind,
                        image,
                    };
                }
                Ok(None) => debug!(provider = %kind, "No cover"),
                Err(e) => warn!(provider = %kind, error = %e, "Provider failed"),
            }
        }

        CoverResolution::Unresolved {
            variations: generate_search_variations(artist, title),
        }
    }

    /// Ask a single provider, bypassing the rest of the chain.
    ///
    /// Library entry point for callers that already know which catalog they
    /// want (the CLI narrows the whole chain with `--provider` instead).
    /// Unlike [`resolve_cover`](Self::resolve_cover), adapter errors such as
    /// a missing Spotify token are returned rather than logged. `Ok(None)`
    /// when `kind` is not part of the chain or has no cover.
    pub async fn fetch_from(
        &self,
        kind: ProviderKind,
        artist: &str,
        title: &str,
    ) -> Result<Option<Bytes>> {
        match self.providers.iter().find(|p| p.kind() == kind) {
            Some(provider) => provider.fetch(artist, title).await,
            None => {
                debug!(provider = %kind, "Provider not active");
                Ok(None)
            }
        }
    }
}

impl std::fmt::Debug for CoverFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverFetcher")
            .field("providers", &self.active_providers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetadataError;
    use async_trait::async_trait;
    use mockall::mock;

    mock! {
        pub Provider {}

        #[async_trait]
        impl CoverProvider for Provider {
            fn kind(&self) -> ProviderKind;
            async fn fetch(&self, artist: &str, title: &str) -> Result<Option<Bytes>>;
        }
    }

    fn provider(kind: ProviderKind, calls: usize, answer: Option<&'static [u8]>) -> MockProvider {
        let mut mock = MockProvider::new();
        mock.expect_kind().return_const(kind);
        mock.expect_fetch()
            .times(calls)
            .returning(move |_, _| Ok(answer.map(Bytes::from_static)));
        mock
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let fetcher = CoverFetcher::new(vec![
            Box::new(provider(ProviderKind::Spotify, 1, None)),
            Box::new(provider(ProviderKind::ITunes, 1, None)),
            Box::new(provider(ProviderKind::MusicBrainz, 1, Some(b"cover"))),
            Box::new(provider(ProviderKind::Discogs, 0, Some(b"never"))),
        ]);

        let resolution = fetcher.resolve_cover("DJ Nova", "Midnight Drive").await;
        assert_eq!(
            resolution,
            CoverResolution::Found {
                provider: ProviderKind::MusicBrainz,
                image: Bytes::from_static(b"cover"),
            }
        );
    }

    #[tokio::test]
    async fn test_errors_fall_through() {
        let mut failing = MockProvider::new();
        failing.expect_kind().return_const(ProviderKind::Spotify);
        failing
            .expect_fetch()
            .times(1)
            .returning(|_, _| Err(MetadataError::ConfigurationError("no token".to_string())));

        let fetcher = CoverFetcher::new(vec![
            Box::new(failing),
            Box::new(provider(ProviderKind::ITunes, 1, Some(b"img"))),
        ]);

        match fetcher.resolve_cover("A", "B").await {
            CoverResolution::Found { provider, .. } => assert_eq!(provider, ProviderKind::ITunes),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unresolved_carries_variations() {
        let fetcher = CoverFetcher::new(vec![
            Box::new(provider(ProviderKind::ITunes, 1, None)),
            Box::new(provider(ProviderKind::MusicBrainz, 1, None)),
        ]);

        let resolution = fetcher.resolve_cover("DJ Nova", "Midnight Drive").await;
        assert_eq!(
            resolution,
            CoverResolution::Unresolved {
                variations: generate_search_variations("DJ Nova", "Midnight Drive"),
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_from_single_provider() {
        let fetcher = CoverFetcher::new(vec![
            Box::new(provider(ProviderKind::ITunes, 0, Some(b"itunes"))),
            Box::new(provider(ProviderKind::MusicBrainz, 1, Some(b"mb"))),
        ]);

        let image = fetcher
            .fetch_from(ProviderKind::MusicBrainz, "A", "B")
            .await
            .unwrap();
        assert_eq!(image, Some(Bytes::from_static(b"mb")));

        let missing = fetcher.fetch_from(ProviderKind::Discogs, "A", "B").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_fetch_from_returns_adapter_errors() {
        let mut failing = MockProvider::new();
        failing.expect_kind().return_const(ProviderKind::Spotify);
        failing
            .expect_fetch()
            .times(1)
            .returning(|_, _| Err(MetadataError::ConfigurationError("no token".to_string())));

        let fetcher = CoverFetcher::new(vec![Box::new(failing)]);
        let err = fetcher
            .fetch_from(ProviderKind::Spotify, "A", "B")
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::ConfigurationError(_)));
    }

    #[test]
    fn test_options_filter() {
        let options = FetcherOptions::default().with_provider_filter(Some(ProviderKind::ITunes));
        assert!(options.allows(ProviderKind::ITunes));
        assert!(!options.allows(ProviderKind::Discogs));
        assert!(FetcherOptions::default().allows(ProviderKind::Discogs));
        assert_eq!(
            FetcherOptions::default().request_delay,
            Duration::from_millis(1500)
        );
    }
}
