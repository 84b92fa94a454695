//! MongoDB driver implementation of the store capability

use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::Document;
use mongodb::options::{
    AggregateOptions, CountOptions, FindOneOptions, FindOptions, InsertOneModel, ReplaceOptions,
    UpdateManyModel, UpdateOptions, WriteModel,
};
use mongodb::results::UpdateResult;
use mongodb::{Client, Collection, Cursor, Database};
use tracing::debug;

use crate::error::{IterError, Result};

use super::{BulkOp, BulkOutcome, DocumentStore, RecordSource, UpdateOutcome};

/// Store backed by one database of a connected [`Client`].
#[derive(Clone, Debug)]
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    /// Wrap an existing client, targeting database `db_name`.
    pub fn new(client: Client, db_name: &str) -> Self {
        let database = client.database(db_name);
        Self { client, database }
    }

    /// The target database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }
}

#[async_trait]
impl RecordSource for Cursor<Document> {
    async fn next_document(&mut self) -> std::result::Result<Option<Document>, IterError> {
        self.try_next().await.map_err(IterError::Cursor)
    }
}

fn update_outcome(result: UpdateResult) -> UpdateOutcome {
    UpdateOutcome {
        matched: result.matched_count,
        modified: result.modified_count,
        upserted: u64::from(result.upserted_id.is_some()),
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Box<dyn RecordSource>> {
        debug!(
            "find on '{}' filter={:?} sort={:?} projection={:?} limit={:?}",
            collection, filter, options.sort, options.projection, options.limit
        );
        let cursor = self
            .collection(collection)
            .find(filter)
            .with_options(options)
            .await?;
        Ok(Box::new(cursor))
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        options: FindOneOptions,
    ) -> Result<Option<Document>> {
        debug!("findOne on '{}' filter={:?}", collection, filter);
        let doc = self
            .collection(collection)
            .find_one(filter)
            .with_options(options)
            .await?;
        Ok(doc)
    }

    async fn count(
        &self,
        collection: &str,
        filter: Document,
        options: CountOptions,
    ) -> Result<u64> {
        debug!(
            "countDocuments on '{}' filter={:?} limit={:?}",
            collection, filter, options.limit
        );
        let count = self
            .collection(collection)
            .count_documents(filter)
            .with_options(options)
            .await?;
        Ok(count)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome> {
        debug!(
            "updateMany on '{}' filter={:?} upsert={}",
            collection, filter, upsert
        );
        let mut options = UpdateOptions::default();
        if upsert {
            options.upsert = Some(true);
        }
        let result = self
            .collection(collection)
            .update_many(filter, update)
            .with_options(options)
            .await?;
        Ok(update_outcome(result))
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateOutcome> {
        debug!("updateOne on '{}' filter={:?}", collection, filter);
        let result = self.collection(collection).update_one(filter, update).await?;
        Ok(update_outcome(result))
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome> {
        debug!(
            "replaceOne on '{}' filter={:?} upsert={}",
            collection, filter, upsert
        );
        let mut options = ReplaceOptions::default();
        if upsert {
            options.upsert = Some(true);
        }
        let result = self
            .collection(collection)
            .replace_one(filter, replacement)
            .with_options(options)
            .await?;
        Ok(update_outcome(result))
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<u64> {
        debug!(
            "insertMany on '{}' with {} documents",
            collection,
            documents.len()
        );
        let result = self.collection(collection).insert_many(documents).await?;
        Ok(result.inserted_ids.len() as u64)
    }

    async fn bulk_write(&self, collection: &str, ops: Vec<BulkOp>) -> Result<BulkOutcome> {
        debug!("bulkWrite on '{}' with {} operations", collection, ops.len());
        let namespace = self.collection(collection).namespace();

        let models: Vec<WriteModel> = ops
            .into_iter()
            .map(|op| match op {
                BulkOp::Insert(document) => WriteModel::InsertOne(
                    InsertOneModel::builder()
                        .namespace(namespace.clone())
                        .document(document)
                        .build(),
                ),
                BulkOp::UpdateMany { filter, update } => WriteModel::UpdateMany(
                    UpdateManyModel::builder()
                        .namespace(namespace.clone())
                        .filter(filter)
                        .update(update)
                        .build(),
                ),
            })
            .collect();

        let result = self.client.bulk_write(models).ordered(true).await?;
        Ok(BulkOutcome {
            inserted: result.inserted_count.max(0) as u64,
            modified: result.modified_count.max(0) as u64,
        })
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
        options: AggregateOptions,
    ) -> Result<Box<dyn RecordSource>> {
        debug!(
            "aggregate on '{}' with {} pipeline stages",
            collection,
            pipeline.len()
        );
        let cursor = self
            .collection(collection)
            .aggregate(pipeline)
            .with_options(options)
            .await?;
        Ok(Box::new(cursor))
    }
}
