//! Per-tool behavior behind `tools/call`. Every outcome a caller can see,
//! including backend failures and rejected questions, is a successful
//! protocol response carrying `ERROR:`-prefixed guidance text; JSON-RPC
//! errors are reserved for the envelope layer.

use std::sync::Arc;

use mcp_types::CallToolResult;
use mcp_types::Tool;
use serde_json::Value;
use tracing::debug;

use crate::backend::SqlBackend;
use crate::format::REJECTION_EXAMPLES;
use crate::format::format_results;
use crate::format::tool_error_result;
use crate::format::tool_text_result;
use crate::intent::extract_user_reference;
use crate::tool_config::ListActiveUsersArgs;
use crate::tool_config::MAX_LIST_LIMIT;
use crate::tool_config::QueryTotaraDbArgs;
use crate::tool_config::create_get_help_tool;
use crate::tool_config::create_list_active_users_tool;
use crate::tool_config::create_query_totara_db_tool;
use crate::tool_config::create_test_vanna_status_tool;
use crate::validation::ValidationConfig;
use crate::validation::ValidationOutcome;
use crate::validation::validate;

const STATUS_USER_COUNT_SQL: &str = "SELECT COUNT(*) as count FROM ttl_user WHERE deleted = 0";

const HELP_TEXT: &str = "HELP: Totara LMS Query Guide

GOOD Questions:
\u{2022} \"Show me all active users\"
\u{2022} \"List courses with enrollment counts\"
\u{2022} \"Find users enrolled in Computer Science course\"
\u{2022} \"Show course completion statistics\"

User-Specific:
\u{2022} \"Show courses for user ID 2\"
\u{2022} \"List progress for user humanadmin\"
\u{2022} \"Show my enrolled courses\"

AVOID:
\u{2022} Too vague: \"help\", \"users\", \"courses\"
\u{2022} Unsafe: \"delete\", \"drop\", \"alter\"
\u{2022} Non-database: \"What's the weather?\"

Tips:
\u{2022} Be specific about what data you want
\u{2022} Use action words: \"show\", \"list\", \"find\", \"count\"
\u{2022} Mention users, courses, or time periods

Commands: list_active_users, test_vanna_status";

pub struct ToolRouter {
    backend: Arc<dyn SqlBackend>,
    validation: ValidationConfig,
}

impl ToolRouter {
    pub fn new(backend: Arc<dyn SqlBackend>, validation: ValidationConfig) -> Self {
        Self {
            backend,
            validation,
        }
    }

    /// The static tool catalogue served for `tools/list`.
    pub fn catalogue() -> Vec<Tool> {
        vec![
            create_query_totara_db_tool(),
            create_test_vanna_status_tool(),
            create_list_active_users_tool(),
            create_get_help_tool(),
        ]
    }

    pub async fn call(&self, name: &str, arguments: Option<Value>) -> CallToolResult {
        debug!("tool call: {name}");
        match name {
            "query_totara_db" => self.query_totara_db(arguments).await,
            "test_vanna_status" => self.test_vanna_status().await,
            "list_active_users" => self.list_active_users(arguments).await,
            "get_help" => tool_text_result(HELP_TEXT),
            _ => tool_error_result(format!(
                "ERROR: Unknown tool '{name}'. Available tools: query_totara_db, test_vanna_status, list_active_users, get_help"
            )),
        }
    }

    async fn query_totara_db(&self, arguments: Option<Value>) -> CallToolResult {
        let args: QueryTotaraDbArgs =
            match serde_json::from_value(arguments.unwrap_or_else(|| Value::Object(Default::default()))) {
                Ok(args) => args,
                Err(_) => {
                    return tool_text_result(format!(
                        "ERROR: Invalid Input - Please provide a valid question as text.{REJECTION_EXAMPLES}"
                    ));
                }
            };

        if let ValidationOutcome::Rejected { message, .. } = validate(&self.validation, &args.question)
        {
            return tool_text_result(format!("{message}{REJECTION_EXAMPLES}"));
        }

        let question = args.question.trim();
        let user_reference = extract_user_reference(&self.validation, question);
        let enriched_question = match &user_reference {
            Some(user) => format!("{question} (targeting {user})"),
            None => question.to_string(),
        };

        let sql = match self.backend.generate_sql(&enriched_question).await {
            Ok(sql) => sql,
            Err(e) => {
                return tool_text_result(format!(
                    "ERROR: Query failed: {e}\n\nTry: Simpler question, check system status"
                ));
            }
        };

        if sql.trim().is_empty() || !sql.to_uppercase().contains("SELECT") {
            return tool_text_result(format!(
                "ERROR: Could not generate query for: {question}\n\nTry rephrasing more clearly."
            ));
        }

        match self.backend.run_sql(&sql).await {
            Ok(rows) => {
                tool_text_result(format_results(question, &sql, &rows, user_reference.as_ref()))
            }
            Err(e) => tool_text_result(format!(
                "ERROR: Query failed: {e}\n\nTry: Simpler question, check system status"
            )),
        }
    }

    async fn test_vanna_status(&self) -> CallToolResult {
        match self.backend.run_sql(STATUS_USER_COUNT_SQL).await {
            Ok(rows) => {
                let user_count = rows
                    .first()
                    .and_then(|row| row.get("count"))
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                let training_count = self.backend.training_item_count().await;
                tool_text_result(format!(
                    "SUCCESS: Vanna MCP Server Status\nVanna: Active with Azure OpenAI\nDatabase: Connected ({user_count} users)\nTraining: {training_count} items loaded\nError Handling: Enhanced validation enabled\nSystem: Ready for queries"
                ))
            }
            Err(e) => tool_text_result(format!("ERROR: Status check failed: {e}")),
        }
    }

    async fn list_active_users(&self, arguments: Option<Value>) -> CallToolResult {
        let args: ListActiveUsersArgs =
            match serde_json::from_value(arguments.unwrap_or_else(|| Value::Object(Default::default()))) {
                Ok(args) => args,
                Err(e) => return tool_text_result(format!("ERROR: Failed to list users: {e}")),
            };
        let limit = args.limit.clamp(1, MAX_LIST_LIMIT);

        let sql = format!(
            "SELECT id, username, firstname, lastname, email\nFROM ttl_user\nWHERE deleted = 0 AND suspended = 0 AND id > 1\nORDER BY timecreated DESC\nLIMIT {limit}"
        );

        match self.backend.run_sql(&sql).await {
            Ok(rows) if !rows.is_empty() => {
                let user_lines: Vec<String> = rows
                    .iter()
                    .map(|row| {
                        format!(
                            "ID {}: {} {} ({})",
                            field(row, "id"),
                            field(row, "firstname"),
                            field(row, "lastname"),
                            field(row, "username"),
                        )
                    })
                    .collect();
                tool_text_result(format!(
                    "Active Users (Top {}):\n\n{}\n\nUsage Examples:\n\u{2022} 'show courses for user ID 2'\n\u{2022} 'my enrolled courses' (defaults to ID {})",
                    rows.len(),
                    user_lines.join("\n"),
                    self.validation.default_user_id,
                ))
            }
            Ok(_) => tool_text_result("No active users found."),
            Err(e) => tool_text_result(format!("ERROR: Failed to list users: {e}")),
        }
    }
}

/// Render one column for the bulleted user list; absent columns show as
/// empty rather than failing the whole listing.
fn field(row: &crate::backend::Row, name: &str) -> String {
    match row.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
