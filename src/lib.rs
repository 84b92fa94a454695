//! mog: short calls for common MongoDB idioms
//!
//! A [`Session`] wraps one store and one current collection and turns the
//! usual find/update/bulk/aggregate/CSV chores into one-line calls.
//!
//! # Modules
//!
//! - `query`: sort, projection and filter construction
//! - `cursor`: result stream with deferred error reporting
//! - `bulk`: ordered write batch
//! - `pipeline`: aggregation pipeline builder
//! - `csv`: line-oriented CSV reader and writer
//! - `session`: the facade tying the pieces together
//! - `store`: storage seam and its MongoDB implementation
//! - `error`: error types
//! - `config`, `connection`, `cli`: setup for the demo binary
//!
//! # Example
//!
//! ```no_run
//! use mog::{Session, config::ConnectionConfig, connection};
//! use mongodb::bson::{Document, doc};
//!
//! #[tokio::main]
//! async fn main() -> mog::Result<()> {
//!     let store = connection::connect(&ConnectionConfig::default()).await?;
//!     let mut session = Session::new(store, "property");
//!
//!     session.set_limit(10);
//!     session.find(Some(doc! { "st": "MT" }), &["-date_added"]).await?;
//!     while let Some(doc) = session.next::<Document>().await? {
//!         println!("{doc}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod bulk;
pub mod cli;
pub mod config;
pub mod connection;
pub mod csv;
pub mod cursor;
pub mod error;
pub mod pipeline;
pub mod query;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use error::{MogError, Result};
pub use pipeline::{AggOptions, JoinPolicy, Pipeline};
pub use query::QueryShape;
pub use session::{Session, new_document_id};
pub use store::{DocumentStore, MongoStore};
