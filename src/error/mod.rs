//! Error handling for mog.
//!
//! Driver errors are carried verbatim in [`MogError::MongoDb`]; this crate
//! never retries or rewrites them. The few conditions the facade detects on
//! its own (not-found lookups, the null-filter update check, deferred
//! iteration failures, CSV problems) get their own variants so callers can
//! match on them.
//!
//! # Example
//!
//! ```rust,no_run
//! use mog::error::{MogError, Result};
//!
//! fn describe(result: Result<()>) -> &'static str {
//!     match result {
//!         Ok(()) => "ok",
//!         Err(e) if e.is_not_found() => "no documents",
//!         Err(MogError::Iteration(_)) => "iteration stopped early",
//!         Err(_) => "failed",
//!     }
//! }
//! ```

pub mod kinds;

pub use kinds::{ConfigError, CsvError, IterError, MogError, Result};
