//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure shared by the other crates:
//! - Logging and tracing infrastructure
//! - Configuration management (credentials and run options)
//!
//! ## Overview
//!
//! This crate establishes the logging conventions and the configuration types
//! that the metadata and service crates consume. It has no knowledge of the
//! providers themselves.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CoverFetchConfig, ProviderCredentials, RunOptions};
pub use error::{Error, Result};
