//! Read operations for the session
//!
//! This module contains the read side of the facade:
//! - find, find_all (and their explicit-shape variants)
//! - find_one, find_by_id
//! - next, iter_err, close_iterator
//! - count

use mongodb::bson::{self, Bson, Document};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::cursor::RecordIter;
use crate::error::{IterError, MogError, Result};
use crate::query::{QueryShape, criteria, id_filter};
use crate::store::DocumentStore;

use super::{Session, guard};

impl<S: DocumentStore> Session<S> {
    /// Open an iterator over documents matching `filter`.
    ///
    /// Consumes the staged projection and limit. `None` matches every
    /// document. Use [`Session::next`] to walk the results.
    ///
    /// # Arguments
    /// * `filter` - Query filter, passed to the store unchanged
    /// * `sort` - Sort tokens; a leading `-` sorts descending
    pub async fn find<F: AsRef<str>>(&mut self, filter: Option<Document>, sort: &[F]) -> Result<()> {
        let shape = self.take_shape().sort(sort);
        self.find_with(filter, shape).await
    }

    /// Open an iterator using an explicit shape. Staged options are untouched.
    pub async fn find_with(&mut self, filter: Option<Document>, shape: QueryShape) -> Result<()> {
        // a new find replaces (and closes) any open stream
        self.iter = None;
        let source = guard(
            &self.cancel,
            self.store
                .find(&self.collection, criteria(filter), shape.find_options()),
        )
        .await?;
        self.iter = Some(RecordIter::new(self.collection.clone(), source));
        Ok(())
    }

    /// Load every document matching `filter` into a vector.
    ///
    /// Same staging rules as [`Session::find`], but nothing is left open.
    pub async fn find_all<T, F>(&mut self, filter: Option<Document>, sort: &[F]) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        F: AsRef<str>,
    {
        let shape = self.take_shape().sort(sort);
        self.find_all_with(filter, shape).await
    }

    /// [`Session::find_all`] with an explicit shape.
    pub async fn find_all_with<T: DeserializeOwned>(
        &mut self,
        filter: Option<Document>,
        shape: QueryShape,
    ) -> Result<Vec<T>> {
        let source = guard(
            &self.cancel,
            self.store
                .find(&self.collection, criteria(filter), shape.find_options()),
        )
        .await?;
        let records: Vec<T> = RecordIter::new(self.collection.clone(), source)
            .collect()
            .await?;
        debug!("find_all on '{}' returned {} records", self.collection, records.len());
        Ok(records)
    }

    /// Return the first document matching `filter` in `sort` order.
    ///
    /// Staged options are not used. Returns [`MogError::NotFound`] when
    /// nothing matches.
    pub async fn find_one<T, F>(&mut self, filter: Option<Document>, sort: &[F]) -> Result<T>
    where
        T: DeserializeOwned,
        F: AsRef<str>,
    {
        self.find_one_with(filter, QueryShape::new().sort(sort)).await
    }

    /// [`Session::find_one`] with an explicit shape (projection and sort apply).
    pub async fn find_one_with<T: DeserializeOwned>(
        &mut self,
        filter: Option<Document>,
        shape: QueryShape,
    ) -> Result<T> {
        let doc = guard(
            &self.cancel,
            self.store
                .find_one(&self.collection, criteria(filter), shape.find_one_options()),
        )
        .await?;
        decode_one(doc)
    }

    /// Return the document whose `_id` equals `id`.
    ///
    /// Returns [`MogError::NotFound`] when there is none.
    pub async fn find_by_id<T: DeserializeOwned>(&mut self, id: impl Into<Bson>) -> Result<T> {
        let doc = guard(
            &self.cancel,
            self.store
                .find_one(&self.collection, id_filter(id), Default::default()),
        )
        .await?;
        decode_one(doc)
    }

    /// Decode the next record from the open iterator.
    ///
    /// `Ok(None)` means the stream is exhausted (or nothing is open). An
    /// `Err` ends iteration; the error is also kept for [`Session::iter_err`].
    pub async fn next<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        match self.iter.as_mut() {
            Some(iter) => iter.next().await,
            None => Ok(None),
        }
    }

    /// The error that ended the last iteration, `None` after a clean run.
    pub fn iter_err(&self) -> Option<&IterError> {
        self.iter.as_ref().and_then(RecordIter::error)
    }

    /// Close the open iterator before it is exhausted.
    pub fn close_iterator(&mut self) {
        if let Some(iter) = self.iter.as_mut() {
            iter.close();
        }
    }

    /// The open iterator, if any.
    pub fn iterator(&self) -> Option<&RecordIter> {
        self.iter.as_ref()
    }

    /// Count documents matching `filter`. Consumes the staged limit.
    pub async fn count(&mut self, filter: Option<Document>) -> Result<u64> {
        let limit = self.pending.limit.take();
        let shape = QueryShape {
            limit,
            ..QueryShape::default()
        };
        self.count_with(filter, shape).await
    }

    /// [`Session::count`] with an explicit shape (only the limit applies).
    pub async fn count_with(&mut self, filter: Option<Document>, shape: QueryShape) -> Result<u64> {
        guard(
            &self.cancel,
            self.store
                .count(&self.collection, criteria(filter), shape.count_options()),
        )
        .await
    }
}

fn decode_one<T: DeserializeOwned>(doc: Option<Document>) -> Result<T> {
    let doc = doc.ok_or(MogError::NotFound)?;
    bson::from_document(doc).map_err(|e| MogError::Iteration(IterError::Decode(e)))
}
