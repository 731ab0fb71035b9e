//! # Configuration Module
//!
//! Provides configuration management for a cover-fetching run.
//!
//! ## Overview
//!
//! A run is described by a [`CoverFetchConfig`]: the source path, the
//! [`RunOptions`] coming from the command line and the
//! [`ProviderCredentials`] coming from the environment. The builder validates
//! everything before a run starts so a bad delay or user agent fails fast.
//!
//! Missing credentials are never an error. Each provider that needs one is
//! simply left out of the fallback chain.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoverFetchConfig, ProviderCredentials, RunOptions};
//!
//! let config = CoverFetchConfig::builder()
//!     .source("/music/incoming")
//!     .options(RunOptions::default().with_request_delay_ms(2000))
//!     .credentials(ProviderCredentials::from_env())
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::logging::redact_if_sensitive;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the Spotify client id
pub const ENV_SPOTIFY_CLIENT_ID: &str = "SPOTIFY_CLIENT_ID";

/// Environment variable holding the Spotify client secret
pub const ENV_SPOTIFY_CLIENT_SECRET: &str = "SPOTIFY_CLIENT_SECRET";

/// Environment variable holding the Discogs personal access token
pub const ENV_DISCOGS_TOKEN: &str = "DISCOGS_TOKEN";

/// Environment variable overriding the user agent sent to every provider
pub const ENV_USER_AGENT: &str = "COVERFETCH_USER_AGENT";

/// Default delay between files and after a throttled response
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 1500;

/// Upper bound accepted for the request delay
pub const MAX_REQUEST_DELAY_MS: u64 = 60_000;

/// Credentials for the providers that need them.
///
/// Blank values are treated as absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderCredentials {
    /// Spotify client-credentials id
    pub spotify_client_id: Option<String>,

    /// Spotify client-credentials secret
    pub spotify_client_secret: Option<String>,

    /// Discogs personal access token
    pub discogs_token: Option<String>,
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |name: &str, value: &Option<String>| {
            value.as_deref().map(|v| redact_if_sensitive(name, v))
        };
        f.debug_struct("ProviderCredentials")
            .field(
                "spotify_client_id",
                &mask("spotify_client_id", &self.spotify_client_id),
            )
            .field(
                "spotify_client_secret",
                &mask("spotify_client_secret", &self.spotify_client_secret),
            )
            .field("discogs_token", &mask("discogs_token", &self.discogs_token))
            .finish()
    }
}

impl ProviderCredentials {
    /// Creates an empty credential set
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads credentials from the process environment.
    ///
    /// Call after `.env` loading so values from a dotenv file are visible.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads credentials through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            spotify_client_id: non_blank(lookup(ENV_SPOTIFY_CLIENT_ID)),
            spotify_client_secret: non_blank(lookup(ENV_SPOTIFY_CLIENT_SECRET)),
            discogs_token: non_blank(lookup(ENV_DISCOGS_TOKEN)),
        }
    }

    /// Sets the Spotify client id and secret
    pub fn with_spotify(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.spotify_client_id = non_blank(Some(client_id.into()));
        self.spotify_client_secret = non_blank(Some(client_secret.into()));
        self
    }

    /// Sets the Discogs token
    pub fn with_discogs_token(mut self, token: impl Into<String>) -> Self {
        self.discogs_token = non_blank(Some(token.into()));
        self
    }

    /// Both halves of the Spotify client credentials are present
    pub fn has_spotify(&self) -> bool {
        self.spotify_client_id.is_some() && self.spotify_client_secret.is_some()
    }

    /// A Discogs token is present
    pub fn has_discogs(&self) -> bool {
        self.discogs_token.is_some()
    }

    /// Names of the credential variables that are not set
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.spotify_client_id.is_none() {
            missing.push(ENV_SPOTIFY_CLIENT_ID);
        }
        if self.spotify_client_secret.is_none() {
            missing.push(ENV_SPOTIFY_CLIENT_SECRET);
        }
        if self.discogs_token.is_none() {
            missing.push(ENV_DISCOGS_TOKEN);
        }
        missing
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Options controlling a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Also write each found cover to `export-covers/<stem>.jpg`
    pub export_covers: bool,

    /// Delay after every file and after a throttled search, in milliseconds
    pub request_delay_ms: u64,

    /// User agent sent to every provider ("AppName/Version (Contact)")
    pub user_agent: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            export_covers: true,
            request_delay_ms: DEFAULT_REQUEST_DELAY_MS,
            user_agent: default_user_agent(),
        }
    }
}

/// `coverfetch/<version>`, used when no agent is configured.
///
/// MusicBrainz asks for contact details in the agent; set
/// `COVERFETCH_USER_AGENT` to e.g. `coverfetch/0.1 ( you@example.org )`.
pub fn default_user_agent() -> String {
    format!("coverfetch/{}", env!("CARGO_PKG_VERSION"))
}

impl RunOptions {
    /// Enables or disables the side-file export
    pub fn with_export_covers(mut self, enabled: bool) -> Self {
        self.export_covers = enabled;
        self
    }

    /// Sets the request delay in milliseconds
    pub fn with_request_delay_ms(mut self, delay_ms: u64) -> Self {
        self.request_delay_ms = delay_ms;
        self
    }

    /// Sets the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Delay as a `Duration`
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Validates the options
    pub fn validate(&self) -> Result<()> {
        if self.request_delay_ms > MAX_REQUEST_DELAY_MS {
            return Err(Error::Config(format!(
                "Request delay exceeds maximum of 60 seconds ({}ms)",
                self.request_delay_ms
            )));
        }

        let ua = self.user_agent.trim();
        if ua.is_empty() {
            return Err(Error::Config("User agent cannot be empty".to_string()));
        }
        if !ua.contains('/') {
            return Err(Error::Config(
                "User agent must follow format: 'AppName/Version (Contact)'".to_string(),
            ));
        }

        Ok(())
    }
}

/// Everything a run needs.
#[derive(Debug, Clone)]
pub struct CoverFetchConfig {
    /// Folder to scan, or a single audio file
    pub source: PathBuf,

    /// Run options
    pub options: RunOptions,

    /// Provider credentials
    pub credentials: ProviderCredentials,
}

impl CoverFetchConfig {
    /// Creates a new builder for constructing a `CoverFetchConfig`.
    pub fn builder() -> CoverFetchConfigBuilder {
        CoverFetchConfigBuilder::default()
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.source.as_os_str().is_empty() {
            return Err(Error::Config("Source path cannot be empty".to_string()));
        }
        self.options.validate()
    }
}

/// Builder for [`CoverFetchConfig`]
#[derive(Debug, Default)]
pub struct CoverFetchConfigBuilder {
    source: Option<PathBuf>,
    options: Option<RunOptions>,
    credentials: Option<ProviderCredentials>,
}

impl CoverFetchConfigBuilder {
    /// Sets the folder or file to process (required)
    pub fn source<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Sets the run options
    pub fn options(mut self, options: RunOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Sets the provider credentials
    pub fn credentials(mut self, credentials: ProviderCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Builds and validates the configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the source is missing or the options are invalid.
    pub fn build(self) -> Result<CoverFetchConfig> {
        let source = self
            .source
            .ok_or_else(|| Error::Config("A source folder or file is required".to_string()))?;

        let config = CoverFetchConfig {
            source,
            options: self.options.unwrap_or_default(),
            credentials: self.credentials.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_credentials_from_lookup() {
        let creds = ProviderCredentials::from_lookup(lookup_from(&[
            (ENV_SPOTIFY_CLIENT_ID, "id"),
            (ENV_SPOTIFY_CLIENT_SECRET, "secret"),
            (ENV_DISCOGS_TOKEN, "tok"),
        ]));

        assert!(creds.has_spotify());
        assert!(creds.has_discogs());
        assert!(creds.missing().is_empty());
    }

    #[test]
    fn test_blank_credentials_are_absent() {
        let creds = ProviderCredentials::from_lookup(lookup_from(&[
            (ENV_SPOTIFY_CLIENT_ID, "id"),
            (ENV_SPOTIFY_CLIENT_SECRET, "   "),
            (ENV_DISCOGS_TOKEN, ""),
        ]));

        assert!(!creds.has_spotify());
        assert!(!creds.has_discogs());
        assert_eq!(
            creds.missing(),
            vec![ENV_SPOTIFY_CLIENT_SECRET, ENV_DISCOGS_TOKEN]
        );
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = ProviderCredentials::new()
            .with_spotify("my-id", "my-secret")
            .with_discogs_token("my-token");
        let rendered = format!("{:?}", creds);

        assert!(!rendered.contains("my-id"));
        assert!(!rendered.contains("my-secret"));
        assert!(!rendered.contains("my-token"));
        assert!(rendered.contains("[REDACTED]"));
        assert!(format!("{:?}", ProviderCredentials::new()).contains("discogs_token: None"));
    }

    #[test]
    fn test_run_options_defaults() {
        let options = RunOptions::default();
        assert!(options.export_covers);
        assert_eq!(
            options.user_agent,
            format!("coverfetch/{}", env!("CARGO_PKG_VERSION"))
        );
        assert_eq!(options.request_delay(), Duration::from_millis(1500));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_run_options_validation() {
        let too_slow = RunOptions::default().with_request_delay_ms(MAX_REQUEST_DELAY_MS + 1);
        assert!(too_slow.validate().is_err());

        let zero_delay = RunOptions::default().with_request_delay_ms(0);
        assert!(zero_delay.validate().is_ok());

        let empty_agent = RunOptions::default().with_user_agent("  ");
        assert!(empty_agent.validate().is_err());

        let bad_agent = RunOptions::default().with_user_agent("coverfetch");
        assert!(bad_agent.validate().is_err());
    }

    #[test]
    fn test_builder_requires_source() {
        let result = CoverFetchConfig::builder().build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_with_defaults() {
        let config = CoverFetchConfig::builder()
            .source("/music")
            .build()
            .unwrap();

        assert_eq!(config.source, PathBuf::from("/music"));
        assert_eq!(config.options, RunOptions::default());
        assert_eq!(config.credentials, ProviderCredentials::default());
    }
}
