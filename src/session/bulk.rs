//! Bulk write operations for the session

use mongodb::bson::{self, Document};
use serde::Serialize;
use tracing::info;

use crate::bulk::BulkBatch;
use crate::error::Result;
use crate::store::DocumentStore;

use super::{Session, guard};

impl<S: DocumentStore> Session<S> {
    /// Start a new batch, discarding any unsubmitted one.
    ///
    /// # Arguments
    /// * `estimated` - Expected number of inserts plus updates
    pub fn bulk_start(&mut self, estimated: usize) {
        self.bulk = Some(BulkBatch::with_capacity(estimated));
    }

    /// Queue an insert of `document`.
    pub fn bulk_add_insert<T: Serialize>(&mut self, document: &T) -> Result<()> {
        let document = bson::to_document(document)?;
        self.bulk
            .get_or_insert_with(BulkBatch::default)
            .add_insert(document);
        Ok(())
    }

    /// Queue an update-many of documents matching `filter`.
    pub fn bulk_add_update(&mut self, filter: Document, update: Document) {
        self.bulk
            .get_or_insert_with(BulkBatch::default)
            .add_update(filter, update);
    }

    /// Number of queued operations.
    pub fn bulk_len(&self) -> usize {
        self.bulk.as_ref().map_or(0, BulkBatch::len)
    }

    /// Submit the queued operations as one ordered request.
    ///
    /// The batch is cleared whether or not the request succeeds. With
    /// nothing queued the store is not contacted.
    ///
    /// With [`MongoStore`](crate::store::MongoStore) this is the driver's
    /// client-level bulk write, which needs MongoDB 8.0 or newer; older
    /// servers reject the request.
    ///
    /// # Returns
    /// * `Result<u64>` - Inserted plus modified count
    pub async fn bulk_write(&mut self) -> Result<u64> {
        let Some(batch) = self.bulk.take().filter(|batch| !batch.is_empty()) else {
            return Ok(0);
        };

        let outcome = guard(
            &self.cancel,
            self.store.bulk_write(&self.collection, batch.into_ops()),
        )
        .await?;
        info!(
            "bulk write on '{}': inserted={} modified={}",
            self.collection, outcome.inserted, outcome.modified
        );
        Ok(outcome.inserted + outcome.modified)
    }
}
