//! Document store capability
//!
//! The facade never talks to the driver directly. It goes through
//! [`DocumentStore`], which runs one request per call, and [`RecordSource`],
//! a forward-only stream of raw documents. [`mongo::MongoStore`] is the
//! production implementation; tests substitute an in-memory one.

use async_trait::async_trait;
use mongodb::bson::Document;
use mongodb::options::{AggregateOptions, CountOptions, FindOneOptions, FindOptions};

use crate::error::{IterError, Result};

pub mod mongo;

pub use mongo::MongoStore;

/// Forward-only stream of documents produced by a find or aggregate.
///
/// Dropping the source closes it.
#[async_trait]
pub trait RecordSource: Send {
    /// Fetch the next raw document, `Ok(None)` once exhausted.
    async fn next_document(&mut self) -> std::result::Result<Option<Document>, IterError>;
}

/// One operation in an ordered bulk batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOp {
    /// Insert one document.
    Insert(Document),

    /// Update every document matching `filter`.
    UpdateMany { filter: Document, update: Document },
}

/// Counts reported by the store for a bulk write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub inserted: u64,
    pub modified: u64,
}

/// Counts reported by the store for an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
    pub upserted: u64,
}

/// Request/response capability the session is built on.
///
/// Every method targets the collection named by `collection` and performs
/// exactly one round trip. Errors are returned as reported.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run a find and return the open stream.
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Box<dyn RecordSource>>;

    /// Return the first matching document, if any.
    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        options: FindOneOptions,
    ) -> Result<Option<Document>>;

    /// Count matching documents.
    async fn count(&self, collection: &str, filter: Document, options: CountOptions)
    -> Result<u64>;

    /// Apply `update` to every matching document.
    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome>;

    /// Apply `update` to the first matching document.
    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateOutcome>;

    /// Replace the first matching document with `replacement`.
    async fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome>;

    /// Insert documents, returning how many were inserted.
    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<u64>;

    /// Submit `ops` as one ordered bulk request.
    async fn bulk_write(&self, collection: &str, ops: Vec<BulkOp>) -> Result<BulkOutcome>;

    /// Run an aggregation pipeline and return the open stream.
    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
        options: AggregateOptions,
    ) -> Result<Box<dyn RecordSource>>;
}
