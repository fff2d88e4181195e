//! The single backend-facing seam between the tool layer and the
//! generation/execution services.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// One result row, column name to JSON value. Column values with no JSON
/// representation are stringified by the adapter.
pub type Row = serde_json::Map<String, Value>;

/// One record of the training corpus that seeds SQL generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainingItem {
    Ddl(String),
    QuestionSql { question: String, sql: String },
    Documentation(String),
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("SQL generation failed: {0}")]
    Generation(String),
    #[error("query execution failed: {0}")]
    Execution(String),
    #[error("database connection failed: {0}")]
    Connection(String),
    #[error("backend transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
}

/// Everything the dispatcher needs from the natural-language-to-SQL
/// backend: generation, execution, training ingestion, and the training
/// count used by the status tool. Concrete adapters compose their clients
/// behind this one interface.
#[async_trait]
pub trait SqlBackend: Send + Sync {
    /// Turn an enriched question into a SQL string. The caller gates the
    /// result on containing a SELECT token; this method makes no such
    /// promise.
    async fn generate_sql(&self, question: &str) -> Result<String, BackendError>;

    /// Execute a SQL statement and return its rows.
    async fn run_sql(&self, sql: &str) -> Result<Vec<Row>, BackendError>;

    /// Add one record to the training corpus.
    async fn train(&self, item: TrainingItem) -> Result<(), BackendError>;

    /// Number of training records currently loaded.
    async fn training_item_count(&self) -> usize;
}
