//! MongoDB client and collection wrapper

use bson::{doc, Document};
use mongodb::{
    options::{IndexOptions, UpdateModifications},
    results::{DeleteResult, UpdateResult},
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use tracing::{error, info};

use crate::types::{ChallengeError, Result};

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri).await.map_err(|e| {
            ChallengeError::Unreachable(format!("Failed to connect to MongoDB: {}", e))
        })?;

        // Verify connection with timeout
        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| ChallengeError::Unreachable(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
{
    /// Create a new collection and apply indexes
    pub async fn new(client: &Client, db_name: &str, collection_name: &str) -> Result<Self> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        // Apply indexes
        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<()> {
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
            .map_err(|e| ChallengeError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document
    pub async fn insert_one(&self, item: T) -> Result<()> {
        self.inner
            .insert_one(item)
            .await
            .map_err(ChallengeError::from)?;

        Ok(())
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>> {
        self.inner
            .find_one(filter)
            .await
            .map_err(ChallengeError::from)
    }

    /// Find documents by filter with an optional sort order and limit
    pub async fn find_sorted(
        &self,
        filter: Document,
        sort: Document,
        limit: i64,
    ) -> Result<Vec<T>> {
        use futures_util::StreamExt;

        let cursor = self
            .inner
            .find(filter)
            .sort(sort)
            .limit(limit)
            .await
            .map_err(ChallengeError::from)?;

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

    /// Update one document
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult> {
        self.inner
            .update_one(filter, update.into())
            .await
            .map_err(ChallengeError::from)
    }

    /// Replace one document wholesale (the stored `_id` is preserved)
    pub async fn replace_one(&self, filter: Document, replacement: T) -> Result<UpdateResult> {
        self.inner
            .replace_one(filter, replacement)
            .await
            .map_err(ChallengeError::from)
    }

    /// Delete one document
    pub async fn delete_one(&self, filter: Document) -> Result<DeleteResult> {
        self.inner
            .delete_one(filter)
            .await
            .map_err(ChallengeError::from)
    }

    /// Get the underlying collection for advanced operations
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    // Integration tests require a running MongoDB instance; the service and
    // repository logic is covered against the in-memory backend instead.
}
