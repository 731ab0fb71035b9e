//! # Metadata & Cover Art Module
//!
//! Works out what a track is and where its cover art can be found.
//!
//! ## Overview
//!
//! This module handles:
//! - Text normalization of tag values and file names
//! - Artist/title resolution from embedded tags with a file name fallback
//! - Search variation generation for fuzzy catalog searches
//! - Cover art lookups against Spotify, iTunes, MusicBrainz and Discogs
//! - Reading artist/title from and embedding covers into audio tags
//!
//! All network access goes through the [`bridge_traits::HttpClient`] seam.

pub mod error;
pub mod fetcher;
pub mod identity;
pub mod normalize;
pub mod providers;
pub mod tags;
pub mod variations;

pub use error::{MetadataError, Result};
pub use fetcher::{CoverFetcher, CoverResolution, FetcherOptions};
pub use identity::{is_audio_file, parse_file_name, resolve_identity, TrackIdentity};
pub use normalize::normalize;
pub use providers::{CoverProvider, ProviderKind};
pub use tags::{EmbeddedTags, LoftyTagStore, TagStore};
pub use variations::generate_search_variations;
