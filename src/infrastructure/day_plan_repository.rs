use crate::domain::models::SequenceBlock;
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Raw block documents of one stored day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredDay {
    pub blocks: Vec<serde_json::Value>,
    /// Stored documents that could not be read as a block list at all.
    pub unreadable: usize,
}

impl From<Vec<serde_json::Value>> for StoredDay {
    fn from(blocks: Vec<serde_json::Value>) -> Self {
        Self {
            blocks,
            unreadable: 0,
        }
    }
}

/// Durable home of each day's block list.
///
/// Loads hand back raw JSON documents so that legacy shapes can be migrated
/// before they are typed; saves always write the current shape. Only storage
/// failures are errors; a damaged document loads as an unreadable day.
#[async_trait]
pub trait DayPlanRepository: Send + Sync {
    async fn load_day(&self, date: NaiveDate) -> Result<Option<StoredDay>, InfraError>;
    async fn save_day(&self, date: NaiveDate, blocks: &[SequenceBlock]) -> Result<(), InfraError>;
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn unreadable_day(key: &str, reason: &str) -> StoredDay {
    log::warn!("ignoring stored day plan {key}: {reason}");
    StoredDay {
        blocks: Vec::new(),
        unreadable: 1,
    }
}

/// Accepts the bare block array as well as the older `{ "sequences": [...] }`
/// day document.
fn block_documents(document: &str, key: &str) -> StoredDay {
    let document = match serde_json::from_str::<serde_json::Value>(document) {
        Ok(document) => document,
        Err(error) => return unreadable_day(key, &error.to_string()),
    };
    match document {
        serde_json::Value::Array(blocks) => StoredDay::from(blocks),
        serde_json::Value::Object(mut day) => match day
            .remove("sequences")
            .or_else(|| day.remove("blocks"))
        {
            Some(serde_json::Value::Array(blocks)) => StoredDay::from(blocks),
            Some(serde_json::Value::Null) | None => StoredDay::default(),
            Some(_) => unreadable_day(key, "block field is not a list"),
        },
        serde_json::Value::Null => StoredDay::default(),
        _ => unreadable_day(key, "not a block list"),
    }
}

#[derive(Debug, Clone)]
pub struct SqliteDayPlanRepository {
    db_path: PathBuf,
}

impl SqliteDayPlanRepository {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(db_path: &Path) -> Result<Connection, InfraError> {
        Connection::open(db_path).map_err(InfraError::from)
    }

    async fn run_blocking<T, F>(&self, work: F) -> Result<T, InfraError>
    where
        T: Send + 'static,
        F: FnOnce(Connection) -> Result<T, InfraError> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || work(Self::connect(&db_path)?))
            .await
            .map_err(|error| InfraError::Persistence(format!("storage task failed: {error}")))?
    }
}

#[async_trait]
impl DayPlanRepository for SqliteDayPlanRepository {
    async fn load_day(&self, date: NaiveDate) -> Result<Option<StoredDay>, InfraError> {
        let key = date_key(date);
        self.run_blocking(move |connection| {
            let document: Option<String> = connection
                .query_row(
                    "SELECT document FROM day_plans WHERE date = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(document) = document else {
                return Ok(None);
            };
            Ok(Some(block_documents(&document, &key)))
        })
        .await
    }

    async fn save_day(&self, date: NaiveDate, blocks: &[SequenceBlock]) -> Result<(), InfraError> {
        let key = date_key(date);
        let document = serde_json::to_string(blocks)?;
        let block_count = blocks.len() as i64;
        self.run_blocking(move |connection| {
            connection.execute(
                "INSERT INTO day_plans (date, document, block_count, saved_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(date) DO UPDATE SET
                   document = excluded.document,
                   block_count = excluded.block_count,
                   saved_at = excluded.saved_at",
                params![key, document, block_count, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDayPlanRepository {
    days: Mutex<HashMap<NaiveDate, Vec<serde_json::Value>>>,
}

impl InMemoryDayPlanRepository {
    /// Stores raw documents as-is, legacy shapes included.
    pub fn with_documents(date: NaiveDate, documents: Vec<serde_json::Value>) -> Self {
        Self {
            days: Mutex::new(HashMap::from([(date, documents)])),
        }
    }
}

#[async_trait]
impl DayPlanRepository for InMemoryDayPlanRepository {
    async fn load_day(&self, date: NaiveDate) -> Result<Option<StoredDay>, InfraError> {
        let days = self
            .days
            .lock()
            .map_err(|error| InfraError::Persistence(format!("day plan lock poisoned: {error}")))?;
        Ok(days.get(&date).cloned().map(StoredDay::from))
    }

    async fn save_day(&self, date: NaiveDate, blocks: &[SequenceBlock]) -> Result<(), InfraError> {
        let documents = blocks
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        let mut days = self
            .days
            .lock()
            .map_err(|error| InfraError::Persistence(format!("day plan lock poisoned: {error}")))?;
        days.insert(date, documents);
        Ok(())
    }
}
