//! Write operations for the session
//!
//! This module contains the single-request writes:
//! - update, update_by_id
//! - replace
//! - insert

use mongodb::bson::{self, Bson, Document};
use serde::Serialize;
use tracing::debug;

use crate::error::{MogError, Result};
use crate::query::{criteria, id_filter};
use crate::store::DocumentStore;

use super::{Session, guard};

impl<S: DocumentStore> Session<S> {
    /// Update every document matching `filter`.
    ///
    /// Consumes the staged upsert flag. Unlike the find calls, a `None`
    /// filter is rejected rather than treated as "match all".
    ///
    /// # Arguments
    /// * `filter` - Query filter (required)
    /// * `update` - Update document (e.g. `{"$set": {...}}`)
    ///
    /// # Returns
    /// * `Result<u64>` - Modified plus upserted count
    pub async fn update(&mut self, filter: Option<Document>, update: Document) -> Result<u64> {
        let upsert = self.take_upsert();
        let Some(filter) = filter else {
            return Err(MogError::Validation(
                "update requires a filter; pass an empty document to match all".to_string(),
            ));
        };

        let outcome = guard(
            &self.cancel,
            self.store
                .update_many(&self.collection, filter, update, upsert),
        )
        .await?;
        debug!(
            "update on '{}': matched={} modified={} upserted={}",
            self.collection, outcome.matched, outcome.modified, outcome.upserted
        );
        Ok(outcome.modified + outcome.upserted)
    }

    /// Update the document whose `_id` equals `id`.
    ///
    /// # Returns
    /// * `Result<u64>` - Modified count (0 or 1)
    pub async fn update_by_id(&mut self, id: impl Into<Bson>, update: Document) -> Result<u64> {
        let outcome = guard(
            &self.cancel,
            self.store
                .update_one(&self.collection, id_filter(id), update),
        )
        .await?;
        Ok(outcome.modified)
    }

    /// Replace the first document matching `filter` with `document`.
    ///
    /// Consumes the staged upsert flag. `None` matches any document.
    pub async fn replace<T: Serialize>(&mut self, filter: Option<Document>, document: &T) -> Result<()> {
        let upsert = self.take_upsert();
        let replacement = bson::to_document(document)?;
        guard(
            &self.cancel,
            self.store
                .replace_one(&self.collection, criteria(filter), replacement, upsert),
        )
        .await?;
        Ok(())
    }

    /// Insert one or more documents.
    ///
    /// For large loads prefer the bulk calls. An empty slice is a no-op.
    ///
    /// # Returns
    /// * `Result<u64>` - Number of documents inserted
    pub async fn insert<T: Serialize>(&mut self, documents: &[T]) -> Result<u64> {
        if documents.is_empty() {
            return Ok(0);
        }
        let documents = documents
            .iter()
            .map(bson::to_document)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        guard(
            &self.cancel,
            self.store.insert_many(&self.collection, documents),
        )
        .await
    }
}
