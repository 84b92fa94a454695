//! Result iteration over an open store stream.
//!
//! A [`RecordIter`] moves through `open -> yielding* -> closed`. It decodes
//! exactly one record per fetch, in store order. When the stream ends, or a
//! fetch or decode fails, the stream is dropped (which closes it on the
//! server) and any error is kept so it can still be inspected after the
//! loop.

use std::fmt;

use mongodb::bson::{self, Document};
use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::{IterError, MogError, Result};
use crate::store::RecordSource;

/// Lifecycle of a [`RecordIter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterState {
    /// The stream may have more records.
    Open,
    /// The stream ran out without error.
    Exhausted,
    /// Iteration stopped on a fetch or decode error.
    Failed,
    /// The caller closed the stream early.
    Closed,
}

/// Wrapper around one open result stream.
pub struct RecordIter {
    /// Collection the stream was opened on (for log messages)
    collection: String,

    /// Live stream; `None` once terminal
    source: Option<Box<dyn RecordSource>>,

    /// Error that ended iteration, if any
    error: Option<IterError>,

    state: IterState,

    /// Number of records successfully decoded
    yielded: usize,
}

impl RecordIter {
    /// Wrap a freshly opened stream.
    pub fn new(collection: impl Into<String>, source: Box<dyn RecordSource>) -> Self {
        Self {
            collection: collection.into(),
            source: Some(source),
            error: None,
            state: IterState::Open,
            yielded: 0,
        }
    }

    /// Fetch and decode the next record.
    ///
    /// Returns `Ok(Some(record))` while records remain, `Ok(None)` once the
    /// stream is exhausted (or already terminal), and `Err` when a fetch or
    /// decode fails. After an `Err` the iterator is terminal and the error is
    /// also available from [`RecordIter::error`].
    pub async fn next<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };

        let doc = match source.next_document().await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                self.finish(IterState::Exhausted, None);
                return Ok(None);
            }
            Err(err) => {
                self.finish(IterState::Failed, Some(err.clone()));
                return Err(MogError::Iteration(err));
            }
        };

        match decode(doc) {
            Ok(record) => {
                self.yielded += 1;
                Ok(Some(record))
            }
            Err(err) => {
                info!("decode error on collection '{}': {}", self.collection, err);
                self.finish(IterState::Failed, Some(err.clone()));
                Err(MogError::Iteration(err))
            }
        }
    }

    /// Drain every remaining record into a vector.
    ///
    /// Unlike [`RecordIter::next`], the first error is returned directly and
    /// the records decoded so far are discarded.
    pub async fn collect<T: DeserializeOwned>(mut self) -> Result<Vec<T>> {
        let mut records = Vec::new();
        while let Some(record) = self.next().await? {
            records.push(record);
        }
        Ok(records)
    }

    /// Close the stream before it is exhausted.
    pub fn close(&mut self) {
        if self.source.is_some() {
            self.finish(IterState::Closed, None);
        }
    }

    /// The error that ended iteration, `None` after a clean run.
    pub fn error(&self) -> Option<&IterError> {
        self.error.as_ref()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> IterState {
        self.state
    }

    /// Number of records decoded so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    fn finish(&mut self, state: IterState, error: Option<IterError>) {
        self.source = None;
        self.state = state;
        self.error = error;
    }
}

fn decode<T: DeserializeOwned>(doc: Document) -> std::result::Result<T, IterError> {
    bson::from_document(doc).map_err(IterError::Decode)
}

impl fmt::Debug for RecordIter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordIter")
            .field("collection", &self.collection)
            .field("state", &self.state)
            .field("yielded", &self.yielded)
            .field("error", &self.error)
            .field("source", &"<record stream>")
            .finish()
    }
}
