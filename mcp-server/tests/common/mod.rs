// Shared fixtures for the integration tests. Not every test binary uses
// every helper.
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use mcp_types::JSONRPC_VERSION;
use mcp_types::JSONRPCMessage;
use mcp_types::JSONRPCRequest;
use mcp_types::RequestId;
use serde_json::Value;
use serde_json::json;
use tokio::sync::Mutex;
use totara_mcp_server::BackendError;
use totara_mcp_server::MessageProcessor;
use totara_mcp_server::Row;
use totara_mcp_server::SqlBackend;
use totara_mcp_server::TrainingItem;
use totara_mcp_server::ValidationConfig;

/// Scriptable stand-in for the real generation/execution backend.
/// `generated_sql: None` simulates a generation failure; `run_error`
/// simulates an execution failure. Calls are recorded for assertions.
pub struct FakeBackend {
    pub generated_sql: Option<String>,
    pub rows: Vec<Row>,
    pub run_error: Option<String>,
    pub seen_questions: Mutex<Vec<String>>,
    pub seen_sql: Mutex<Vec<String>>,
    pub training: Mutex<Vec<TrainingItem>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            generated_sql: Some("SELECT id, username FROM ttl_user".to_string()),
            rows: Vec::new(),
            run_error: None,
            seen_questions: Mutex::new(Vec::new()),
            seen_sql: Mutex::new(Vec::new()),
            training: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SqlBackend for FakeBackend {
    async fn generate_sql(&self, question: &str) -> Result<String, BackendError> {
        self.seen_questions.lock().await.push(question.to_string());
        self.generated_sql
            .clone()
            .ok_or_else(|| BackendError::Generation("model unavailable".to_string()))
    }

    async fn run_sql(&self, sql: &str) -> Result<Vec<Row>, BackendError> {
        self.seen_sql.lock().await.push(sql.to_string());
        match &self.run_error {
            Some(message) => Err(BackendError::Execution(message.clone())),
            None => Ok(self.rows.clone()),
        }
    }

    async fn train(&self, item: TrainingItem) -> Result<(), BackendError> {
        self.training.lock().await.push(item);
        Ok(())
    }

    async fn training_item_count(&self) -> usize {
        self.training.lock().await.len()
    }
}

pub fn processor(backend: Arc<FakeBackend>) -> MessageProcessor {
    let validation = match ValidationConfig::new() {
        Ok(validation) => validation,
        Err(e) => panic!("built-in patterns must compile: {e}"),
    };
    MessageProcessor::new(backend, validation)
}

pub fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

pub fn request(id: i64, method: &str, params: Option<Value>) -> JSONRPCMessage {
    JSONRPCMessage::Request(JSONRPCRequest {
        jsonrpc: Some(JSONRPC_VERSION.to_string()),
        id: Some(RequestId::Integer(id)),
        method: method.to_string(),
        params,
    })
}

pub fn tool_call(id: i64, name: &str, arguments: Value) -> JSONRPCMessage {
    request(
        id,
        "tools/call",
        Some(json!({"name": name, "arguments": arguments})),
    )
}

/// Dispatch one message and return the outgoing message in wire form.
pub async fn dispatch(processor: &mut MessageProcessor, message: JSONRPCMessage) -> Value {
    let Some(outgoing) = processor.process_message(message).await else {
        panic!("expected a response message");
    };
    match serde_json::to_value(JSONRPCMessage::from(outgoing)) {
        Ok(value) => value,
        Err(e) => panic!("failed to serialize outgoing message: {e}"),
    }
}

/// The text of the single content block every tool response carries.
pub fn result_text(response: &Value) -> &str {
    match response["result"]["content"][0]["text"].as_str() {
        Some(text) => text,
        None => panic!("response carries no text content: {response}"),
    }
}
