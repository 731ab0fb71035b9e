//! Cover processing service.
//!
//! Runs the cover pipeline from `core-metadata` over a folder (or a single
//! file) and keeps the run's failure log. Hosts supply the provider chain and
//! a [`TagStore`](core_metadata::TagStore); the binary wires the desktop HTTP
//! bridge and the `lofty` tag store.

pub mod error;
pub mod failure_log;
pub mod processor;

pub use error::{Result, ServiceError};
pub use failure_log::{FailureEntry, FailureLog, FAILURE_LOG_FILE_NAME};
pub use processor::{CoverProcessor, ProcessSummary, EXPORT_DIR_NAME};
