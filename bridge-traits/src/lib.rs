//! # Host Bridge Traits
//!
//! Platform abstraction traits that the core crates depend on instead of
//! concrete libraries.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with per-request timeouts
//!
//! Desktop hosts use the `reqwest`-backed implementation from `bridge-desktop`;
//! tests substitute scripted clients.
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Implementations
//! should convert library-specific errors to `BridgeError` and keep the failing
//! URL or path in the message.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so they can be shared behind `Arc`.

pub mod error;
pub mod http;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
