//! In-memory store that records every request it receives.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use mog::error::{IterError, MogError, Result};
use mog::store::{BulkOp, BulkOutcome, DocumentStore, RecordSource, UpdateOutcome};
use mongodb::bson::Document;
use mongodb::options::{AggregateOptions, CountOptions, FindOneOptions, FindOptions};

/// One request as seen by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Find {
        collection: String,
        filter: Document,
        projection: Option<Document>,
        limit: Option<i64>,
        sort: Option<Document>,
    },
    FindOne {
        collection: String,
        filter: Document,
        projection: Option<Document>,
        sort: Option<Document>,
    },
    Count {
        collection: String,
        filter: Document,
        limit: Option<u64>,
    },
    UpdateMany {
        collection: String,
        filter: Document,
        update: Document,
        upsert: bool,
    },
    UpdateOne {
        collection: String,
        filter: Document,
        update: Document,
    },
    ReplaceOne {
        collection: String,
        filter: Document,
        replacement: Document,
        upsert: bool,
    },
    InsertMany {
        collection: String,
        documents: Vec<Document>,
    },
    BulkWrite {
        collection: String,
        ops: Vec<BulkOp>,
    },
    Aggregate {
        collection: String,
        pipeline: Vec<Document>,
        max_time: Option<Duration>,
    },
}

/// Canned-response store for facade tests.
#[derive(Default)]
pub struct SpyStore {
    calls: Mutex<Vec<Call>>,
    streams: Mutex<VecDeque<(Vec<Document>, bool)>>,
    found: Mutex<Option<Document>>,
    count: u64,
    update: UpdateOutcome,
    fail_writes: bool,
    stall: bool,
}

impl SpyStore {
    pub fn new() -> Self {
        Self {
            update: UpdateOutcome {
                matched: 1,
                modified: 1,
                upserted: 0,
            },
            ..Self::default()
        }
    }

    /// Queue the documents returned by the next find or aggregate.
    pub fn with_stream(self, docs: Vec<Document>) -> Self {
        self.streams.lock().unwrap().push_back((docs, false));
        self
    }

    /// Queue a stream that fails with a driver error after `docs`.
    pub fn with_broken_stream(self, docs: Vec<Document>) -> Self {
        self.streams.lock().unwrap().push_back((docs, true));
        self
    }

    /// Document returned by find_one.
    pub fn with_found(self, doc: Document) -> Self {
        *self.found.lock().unwrap() = Some(doc);
        self
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    pub fn with_update(mut self, outcome: UpdateOutcome) -> Self {
        self.update = outcome;
        self
    }

    /// Make every bulk write fail.
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Make every request hang until cancelled.
    pub fn stalled(mut self) -> Self {
        self.stall = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> Option<Call> {
        self.calls.lock().unwrap().last().cloned()
    }

    async fn record(&self, call: Call) {
        if self.stall {
            std::future::pending::<()>().await;
        }
        self.calls.lock().unwrap().push(call);
    }

    fn next_stream(&self) -> Box<dyn RecordSource> {
        let (docs, broken) = self.streams.lock().unwrap().pop_front().unwrap_or_default();
        let mut source = VecSource::new(docs);
        source.broken = broken;
        Box::new(source)
    }
}

#[async_trait]
impl DocumentStore for SpyStore {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Box<dyn RecordSource>> {
        self.record(Call::Find {
            collection: collection.to_string(),
            filter,
            projection: options.projection,
            limit: options.limit,
            sort: options.sort,
        })
        .await;
        Ok(self.next_stream())
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        options: FindOneOptions,
    ) -> Result<Option<Document>> {
        self.record(Call::FindOne {
            collection: collection.to_string(),
            filter,
            projection: options.projection,
            sort: options.sort,
        })
        .await;
        Ok(self.found.lock().unwrap().clone())
    }

    async fn count(
        &self,
        collection: &str,
        filter: Document,
        options: CountOptions,
    ) -> Result<u64> {
        self.record(Call::Count {
            collection: collection.to_string(),
            filter,
            limit: options.limit,
        })
        .await;
        Ok(self.count)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome> {
        self.record(Call::UpdateMany {
            collection: collection.to_string(),
            filter,
            update,
            upsert,
        })
        .await;
        Ok(self.update)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateOutcome> {
        self.record(Call::UpdateOne {
            collection: collection.to_string(),
            filter,
            update,
        })
        .await;
        Ok(self.update)
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome> {
        self.record(Call::ReplaceOne {
            collection: collection.to_string(),
            filter,
            replacement,
            upsert,
        })
        .await;
        Ok(self.update)
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<u64> {
        let inserted = documents.len() as u64;
        self.record(Call::InsertMany {
            collection: collection.to_string(),
            documents,
        })
        .await;
        Ok(inserted)
    }

    async fn bulk_write(&self, collection: &str, ops: Vec<BulkOp>) -> Result<BulkOutcome> {
        let inserted = ops
            .iter()
            .filter(|op| matches!(op, BulkOp::Insert(_)))
            .count() as u64;
        let modified = ops.len() as u64 - inserted;
        self.record(Call::BulkWrite {
            collection: collection.to_string(),
            ops,
        })
        .await;

        if self.fail_writes {
            return Err(MogError::State("bulk write rejected".to_string()));
        }
        Ok(BulkOutcome { inserted, modified })
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
        options: AggregateOptions,
    ) -> Result<Box<dyn RecordSource>> {
        self.record(Call::Aggregate {
            collection: collection.to_string(),
            pipeline,
            max_time: options.max_time,
        })
        .await;
        Ok(self.next_stream())
    }
}

/// Stream over a fixed list of documents, optionally failing at the end.
pub struct VecSource {
    docs: VecDeque<Document>,
    broken: bool,
}

impl VecSource {
    pub fn new(docs: Vec<Document>) -> Self {
        Self {
            docs: docs.into(),
            broken: false,
        }
    }
}

#[async_trait]
impl RecordSource for VecSource {
    async fn next_document(&mut self) -> std::result::Result<Option<Document>, IterError> {
        match self.docs.pop_front() {
            Some(doc) => Ok(Some(doc)),
            None if self.broken => {
                let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
                Err(IterError::Cursor(mongodb::error::Error::from(io)))
            }
            None => Ok(None),
        }
    }
}
