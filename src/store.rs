use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::models::ResultRecord;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Append-only sink for result records
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Insert `record` into `collection`. Never updates or deduplicates.
    async fn append(&self, collection: &str, record: &ResultRecord) -> Result<(), StoreError>;
}

/// Source of prompt documents
#[async_trait]
pub trait PromptStore: Send + Sync {
    /// String values of `field` from documents in `collection` that have one,
    /// in store order, at most `limit` of them
    async fn fetch_questions(
        &self,
        collection: &str,
        field: &str,
        limit: Option<u64>,
    ) -> Result<Vec<String>, StoreError>;
}

/// MongoDB-backed store. The client is created once and shared by every write.
#[derive(Clone)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// Parse the connection string and prepare a client. The driver connects
    /// lazily, so an unreachable server surfaces on the first operation.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        options.server_selection_timeout =
            Some(Duration::from_secs(config.server_selection_timeout_secs));

        let client = Client::with_options(options).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            database: client.database(&config.database),
        })
    }
}

#[async_trait]
impl ResponseStore for MongoStore {
    async fn append(&self, collection: &str, record: &ResultRecord) -> Result<(), StoreError> {
        self.database
            .collection::<ResultRecord>(collection)
            .insert_one(record)
            .await
            .map_err(|e| StoreError::Write {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;
        debug!(collection, model = record.model.as_str(), "Inserted record");
        Ok(())
    }
}

#[async_trait]
impl PromptStore for MongoStore {
    async fn fetch_questions(
        &self,
        collection: &str,
        field: &str,
        limit: Option<u64>,
    ) -> Result<Vec<String>, StoreError> {
        let query_error = |e: mongodb::error::Error| StoreError::Query {
            collection: collection.to_string(),
            message: e.to_string(),
        };

        let mut filter = Document::new();
        filter.insert(field, doc! { "$type": "string" });
        let mut projection = Document::new();
        projection.insert(field, 1);

        let documents = self.database.collection::<Document>(collection);
        let mut find = documents.find(filter).projection(projection);
        if let Some(limit) = limit {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let mut cursor = find.await.map_err(query_error)?;
        let mut questions = Vec::new();
        while let Some(document) = cursor.try_next().await.map_err(query_error)? {
            if let Ok(question) = document.get_str(field) {
                questions.push(question.to_string());
            }
        }
        Ok(questions)
    }
}

/// In-process store. Used for `--dry-run` and as the test double for MongoDB.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Vec<ResultRecord>>>,
    prompts: Mutex<HashMap<String, Vec<serde_json::Value>>>,
    unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every operation fails, as if the server were down
    #[cfg(test)]
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Seed `collection` with raw prompt documents
    #[cfg(test)]
    pub fn with_prompt_documents(self, collection: &str, documents: Vec<serde_json::Value>) -> Self {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(collection.to_string(), documents);
        self
    }

    /// Records in `collection`, in insertion order
    #[cfg(test)]
    pub fn records(&self, collection: &str) -> Vec<ResultRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Every collection with its records, sorted by collection name
    pub fn snapshot(&self) -> Vec<(String, Vec<ResultRecord>)> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let mut collections: Vec<_> = records
            .iter()
            .map(|(name, records)| (name.clone(), records.clone()))
            .collect();
        collections.sort_by(|a, b| a.0.cmp(&b.0));
        collections
    }

    #[cfg(test)]
    pub fn total_records(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(Vec::len)
            .sum()
    }
}

#[async_trait]
impl ResponseStore for MemoryStore {
    async fn append(&self, collection: &str, record: &ResultRecord) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("memory store marked unavailable".to_string()));
        }
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());
        Ok(())
    }
}

#[async_trait]
impl PromptStore for MemoryStore {
    async fn fetch_questions(
        &self,
        collection: &str,
        field: &str,
        limit: Option<u64>,
    ) -> Result<Vec<String>, StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("memory store marked unavailable".to_string()));
        }
        let prompts = self.prompts.lock().unwrap_or_else(|e| e.into_inner());
        let questions = prompts
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter_map(|document| document.get(field).and_then(|v| v.as_str()))
                    .map(str::to_string)
                    .take(limit.map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX)))
                    .collect()
            })
            .unwrap_or_default();
        Ok(questions)
    }
}
