//! Session facade
//!
//! A [`Session`] is bound to one store and one current collection. It
//! offers short calls for the common query, update, bulk, aggregation and
//! CSV idioms:
//! - Read: find, find_all, find_one, find_by_id, count, next
//! - Write: update, update_by_id, replace, insert
//! - Bulk: bulk_start, bulk_add_insert, bulk_add_update, bulk_write
//! - Aggregate: agg_start, agg_stage, agg_keep, agg_omit, agg_sort,
//!   agg_lookup_by_id, agg_totals, agg_run, agg_run_all
//! - CSV: csv_out_start, csv_write, csv_out_done, csv_in_start, csv_read,
//!   csv_read_all, csv_in_done
//!
//! `keep`, `omit`, `set_limit` and `upsert` stage options for the next call
//! that reads them, which then resets them. The `*_with` variants take a
//! [`QueryShape`] explicitly and leave staged options alone.
//!
//! A session is meant for one logical call sequence; every method takes
//! `&mut self`.

use std::fmt;
use std::future::Future;

use mongodb::bson::oid::ObjectId;
use tokio_util::sync::CancellationToken;

use crate::bulk::BulkBatch;
use crate::csv::{CsvReader, CsvWriter};
use crate::cursor::RecordIter;
use crate::error::{MogError, Result};
use crate::pipeline::Pipeline;
use crate::query::QueryShape;
use crate::store::{DocumentStore, MongoStore};

mod aggregate;
mod bulk;
mod csv;
mod read;
mod write;

/// Facade over one store and one current collection.
pub struct Session<S = MongoStore> {
    /// Backing store
    store: S,

    /// Current collection name
    collection: String,

    /// Raced against every store call
    cancel: CancellationToken,

    /// Projection and limit for the next find/count
    pending: QueryShape,

    /// Upsert flag for the next update/replace
    upsert: bool,

    /// Batch being assembled by the bulk calls
    bulk: Option<BulkBatch>,

    /// Aggregation stages
    pipeline: Pipeline,

    /// The one open result stream
    iter: Option<RecordIter>,

    csv_out: Option<CsvWriter>,
    csv_in: Option<CsvReader>,
}

impl<S: DocumentStore> Session<S> {
    /// Create a session on `store` targeting `collection`.
    ///
    /// # Arguments
    /// * `store` - Backing document store
    /// * `collection` - Initial collection name (may be empty and set later)
    pub fn new(store: S, collection: impl Into<String>) -> Self {
        Self::with_cancel(store, collection, CancellationToken::new())
    }

    /// Create a session whose store calls stop when `cancel` fires.
    ///
    /// A cancelled call returns [`MogError::Cancelled`]; the session stays usable.
    pub fn with_cancel(store: S, collection: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            store,
            collection: collection.into(),
            cancel,
            pending: QueryShape::default(),
            upsert: false,
            bulk: None,
            pipeline: Pipeline::new(),
            iter: None,
            csv_out: None,
            csv_in: None,
        }
    }

    /// Point the session at another collection.
    pub fn set_collection(&mut self, collection: impl Into<String>) {
        self.collection = collection.into();
    }

    /// Current collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Limit the next find or count to `limit` documents.
    pub fn set_limit(&mut self, limit: i64) {
        self.pending.limit = (limit > 0).then_some(limit);
    }

    /// Make the next update or replace insert when nothing matches.
    pub fn upsert(&mut self) {
        self.upsert = true;
    }

    /// Return only `fields` from the next find. An empty list resets to all fields.
    pub fn keep<F: AsRef<str>>(&mut self, fields: &[F]) {
        let shape = std::mem::take(&mut self.pending);
        self.pending = shape.keep(fields);
    }

    /// Drop `fields` from the next find. An empty list resets to all fields.
    pub fn omit<F: AsRef<str>>(&mut self, fields: &[F]) {
        let shape = std::mem::take(&mut self.pending);
        self.pending = shape.omit(fields);
    }

    /// Options staged for the next find or count.
    pub fn pending_shape(&self) -> &QueryShape {
        &self.pending
    }

    /// Whether the next update or replace will upsert.
    pub fn upsert_pending(&self) -> bool {
        self.upsert
    }

    fn take_shape(&mut self) -> QueryShape {
        std::mem::take(&mut self.pending)
    }

    fn take_upsert(&mut self) -> bool {
        std::mem::take(&mut self.upsert)
    }
}

/// Generate a fresh document id as a 24-character hex string.
pub fn new_document_id() -> String {
    ObjectId::new().to_hex()
}

/// Run `fut` unless `cancel` fires first.
///
/// An already-cancelled token always wins, even over a ready future.
async fn guard<T>(cancel: &CancellationToken, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(MogError::Cancelled),
        result = fut => result,
    }
}

impl<S> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("collection", &self.collection)
            .field("pending", &self.pending)
            .field("upsert", &self.upsert)
            .field("bulk", &self.bulk.as_ref().map(BulkBatch::len))
            .field("pipeline", &self.pipeline.len())
            .field("iter", &self.iter)
            .field("csv_out", &self.csv_out.is_some())
            .field("csv_in", &self.csv_in.is_some())
            .finish()
    }
}
