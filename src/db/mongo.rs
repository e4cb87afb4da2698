//! MongoDB client and collection wrapper

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument, UpdateModifications},
    results::{DeleteResult, UpdateResult},
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, info};

use crate::db::schemas::Metadata;
use crate::types::FarmError;

const DUPLICATE_KEY: i32 = 11000;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// Outcome of a write guarded by a unique index
#[derive(Debug)]
pub enum Unique<T> {
    Written(T),
    /// The write collided with an existing document
    Duplicate,
}

/// Whether a driver error is a unique index violation
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

fn unique<T>(result: mongodb::error::Result<T>, op: &str) -> Result<Unique<T>, FarmError> {
    match result {
        Ok(v) => Ok(Unique::Written(v)),
        Err(e) if is_duplicate_key(&e) => Ok(Unique::Duplicate),
        Err(e) => Err(FarmError::Database(format!("{} failed: {}", op, e))),
    }
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and ping the database
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, FarmError> {
        info!("Connecting to MongoDB at {}", uri);

        // Fail fast when MongoDB is unreachable
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| FarmError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| FarmError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection, creating its indexes
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, FarmError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }
}

/// Typed MongoDB collection with automatic indexing.
///
/// `find_*` and `count` skip soft-deleted documents; upserts and deletes act
/// on the raw filter.
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
{
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, FarmError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    async fn apply_indexes(&self) -> Result<(), FarmError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| FarmError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    fn stamp(item: &mut T) {
        let metadata = item.mut_metadata();
        metadata.is_deleted = false;
        metadata.created_at = Some(DateTime::now());
        metadata.updated_at = Some(DateTime::now());
    }

    fn live(filter: Document) -> Document {
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });
        full_filter
    }

    /// Insert a document, setting metadata timestamps
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId, FarmError> {
        Self::stamp(&mut item);

        let result = self
            .inner
            .insert_one(item)
            .await
            .map_err(|e| FarmError::Database(format!("Insert failed: {}", e)))?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| FarmError::Database("Failed to get inserted ID".into()))
    }

    /// Insert a document that a unique index may reject
    pub async fn insert_unique(&self, mut item: T) -> Result<Unique<()>, FarmError> {
        Self::stamp(&mut item);
        let result = unique(self.inner.insert_one(item).await, "Insert")?;
        Ok(match result {
            Unique::Written(_) => Unique::Written(()),
            Unique::Duplicate => Unique::Duplicate,
        })
    }

    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, FarmError> {
        self.inner
            .find_one(Self::live(filter))
            .await
            .map_err(|e| FarmError::Database(format!("Find failed: {}", e)))
    }

    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>, FarmError> {
        self.find_many_sorted(filter, doc! { "_id": 1 }).await
    }

    /// Find documents in `sort` order. Unreadable documents are logged and skipped.
    pub async fn find_many_sorted(
        &self,
        filter: Document,
        sort: Document,
    ) -> Result<Vec<T>, FarmError> {
        use futures_util::StreamExt;

        let cursor = self
            .inner
            .find(Self::live(filter))
            .sort(sort)
            .await
            .map_err(|e| FarmError::Database(format!("Find failed: {}", e)))?;

        let results: Vec<T> = cursor
            .filter_map(|doc| async {
                match doc {
                    Ok(d) => Some(d),
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(results)
    }

    pub async fn count(&self, filter: Document) -> Result<u64, FarmError> {
        self.inner
            .count_documents(Self::live(filter))
            .await
            .map_err(|e| FarmError::Database(format!("Count failed: {}", e)))
    }

    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, FarmError> {
        self.inner
            .update_one(filter, update.into())
            .await
            .map_err(|e| FarmError::Database(format!("Update failed: {}", e)))
    }

    /// Update, inserting when nothing matches
    pub async fn upsert_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<Unique<UpdateResult>, FarmError> {
        unique(
            self.inner.update_one(filter, update.into()).upsert(true).await,
            "Upsert",
        )
    }

    /// Atomic read-modify-write, inserting when nothing matches.
    /// `returns` selects the document before or after the update.
    pub async fn find_one_and_upsert(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
        returns: ReturnDocument,
    ) -> Result<Unique<Option<T>>, FarmError> {
        unique(
            self.inner
                .find_one_and_update(filter, update.into())
                .upsert(true)
                .return_document(returns)
                .await,
            "Find and modify",
        )
    }

    /// Atomic read-modify-write on an existing document
    pub async fn find_one_and_update(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<Option<T>, FarmError> {
        self.inner
            .find_one_and_update(Self::live(filter), update.into())
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| FarmError::Database(format!("Find and modify failed: {}", e)))
    }

    /// Remove a document outright
    pub async fn delete_one(&self, filter: Document) -> Result<DeleteResult, FarmError> {
        self.inner
            .delete_one(filter)
            .await
            .map_err(|e| FarmError::Database(format!("Delete failed: {}", e)))
    }

    /// Soft delete a document
    pub async fn soft_delete(&self, filter: Document) -> Result<UpdateResult, FarmError> {
        let update = doc! {
            "$set": {
                "metadata.is_deleted": true,
                "metadata.deleted_at": DateTime::now(),
                "metadata.updated_at": DateTime::now(),
            }
        };

        self.update_one(filter, update).await
    }
}
