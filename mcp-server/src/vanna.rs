//! Concrete backend adapter: an Azure OpenAI chat-completion client for SQL
//! generation composed with a MySQL pool for execution. The training corpus
//! lives in memory and seeds the generation prompt; anything smarter than
//! that (vector retrieval, ranking) is out of scope here.

use serde_json::Value;
use serde_json::json;
use sqlx::Column;
use sqlx::Row as SqlxRow;
use sqlx::mysql::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::mysql::MySqlRow;
use tokio::sync::RwLock;

use async_trait::async_trait;

use crate::backend::BackendError;
use crate::backend::Row;
use crate::backend::SqlBackend;
use crate::backend::TrainingItem;
use crate::config::CompletionConfig;
use crate::config::ServerConfig;

/// Example pairs beyond this many are left out of the prompt; the most
/// recently trained pairs win.
const MAX_PROMPT_EXAMPLES: usize = 20;

pub struct VannaBackend {
    completion: CompletionClient,
    pool: MySqlPool,
    training: RwLock<Vec<TrainingItem>>,
}

impl VannaBackend {
    /// Connect to the database and build the completion client. Fails fast:
    /// a server with no database has nothing to serve.
    pub async fn connect(config: &ServerConfig) -> Result<Self, BackendError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .connect(&config.database.url())
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        Ok(Self {
            completion: CompletionClient::new(config.completion.clone()),
            pool,
            training: RwLock::new(Vec::new()),
        })
    }
}

#[async_trait]
impl SqlBackend for VannaBackend {
    async fn generate_sql(&self, question: &str) -> Result<String, BackendError> {
        let system_prompt = {
            let training = self.training.read().await;
            build_system_prompt(&training)
        };
        let content = self.completion.complete(&system_prompt, question).await?;
        Ok(strip_sql_fences(&content))
    }

    async fn run_sql(&self, sql: &str) -> Result<Vec<Row>, BackendError> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BackendError::Execution(e.to_string()))?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn train(&self, item: TrainingItem) -> Result<(), BackendError> {
        self.training.write().await.push(item);
        Ok(())
    }

    async fn training_item_count(&self) -> usize {
        self.training.read().await.len()
    }
}

pub struct CompletionClient {
    client: reqwest::Client,
    config: CompletionConfig,
}

impl CompletionClient {
    pub fn new(config: CompletionConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// One chat-completions round trip; returns the assistant message text.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, BackendError> {
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.deployment,
            self.config.api_version
        );
        let body = json!({
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": 0.0,
        });

        let response: Value = self
            .client
            .post(&url)
            .header("api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                BackendError::MalformedResponse(
                    "missing choices[0].message.content".to_string(),
                )
            })
    }
}

fn build_system_prompt(training: &[TrainingItem]) -> String {
    let mut ddl = Vec::new();
    let mut docs = Vec::new();
    let mut pairs = Vec::new();
    for item in training {
        match item {
            TrainingItem::Ddl(statement) => ddl.push(statement.as_str()),
            TrainingItem::Documentation(text) => docs.push(text.as_str()),
            TrainingItem::QuestionSql { question, sql } => {
                pairs.push(format!("Q: {question}\nSQL: {sql}"))
            }
        }
    }
    if pairs.len() > MAX_PROMPT_EXAMPLES {
        pairs.drain(..pairs.len() - MAX_PROMPT_EXAMPLES);
    }

    let mut prompt = String::from(
        "You are a MySQL expert for a Totara LMS database. Answer the user's \
         question with a single SELECT statement. Respond with SQL only, no \
         explanation.",
    );
    if !ddl.is_empty() {
        prompt.push_str("\n\n=== Tables ===\n");
        prompt.push_str(&ddl.join("\n\n"));
    }
    if !docs.is_empty() {
        prompt.push_str("\n\n=== Documentation ===\n");
        prompt.push_str(&docs.join("\n"));
    }
    if !pairs.is_empty() {
        prompt.push_str("\n\n=== Examples ===\n");
        prompt.push_str(&pairs.join("\n\n"));
    }
    prompt
}

/// Models tend to wrap SQL in markdown fences even when told not to.
fn strip_sql_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let rest = rest.strip_prefix("sql").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\r', '\n']);
    match rest.find("```") {
        Some(end) => rest[..end].trim().to_string(),
        None => rest.trim().to_string(),
    }
}

fn row_to_json(row: &MySqlRow) -> Row {
    let mut out = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        out.insert(column.name().to_string(), column_value(row, index));
    }
    out
}

/// Decode one column into JSON by trying the common MySQL type families in
/// turn; temporal values are stringified, anything undecodable becomes null.
fn column_value(row: &MySqlRow, index: usize) -> Value {
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return value.map_or(Value::Null, Value::from);
    }
    if let Ok(value) = row.try_get::<Option<u64>, _>(index) {
        return value.map_or(Value::Null, Value::from);
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return value.map_or(Value::Null, Value::from);
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
        return value.map_or(Value::Null, Value::from);
    }
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return value.map_or(Value::Null, Value::from);
    }
    if let Ok(value) = row.try_get::<Option<chrono::NaiveDateTime>, _>(index) {
        return value.map_or(Value::Null, |v| Value::from(v.to_string()));
    }
    if let Ok(value) = row.try_get::<Option<chrono::NaiveDate>, _>(index) {
        return value.map_or(Value::Null, |v| Value::from(v.to_string()));
    }
    Value::Null
}
