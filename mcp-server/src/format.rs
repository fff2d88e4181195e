//! Shaping of tool output into the protocol's content envelope.

use mcp_types::CallToolResult;
use mcp_types::ContentBlock;
use mcp_types::TextContent;

use crate::backend::Row;
use crate::intent::UserReference;

/// Wrap plain text in the universal `{content:[{type:"text",text}]}`
/// envelope used for every tool response, success and domain error alike.
pub fn tool_text_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::TextContent(TextContent {
            r#type: "text".to_string(),
            text: text.into(),
            annotations: None,
        })],
        is_error: None,
        structured_content: None,
    }
}

/// Same envelope, flagged as an error for hosts that surface the flag.
pub fn tool_error_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult {
        is_error: Some(true),
        ..tool_text_result(text)
    }
}

/// Guidance appended to every validation rejection before it is wrapped.
pub const REJECTION_EXAMPLES: &str =
    "\n\nExamples:\n\u{2022} 'Show me all active users'\n\u{2022} 'List courses with enrollments'";

/// Render a completed query as a deterministic multi-section text block:
/// echoed question, optional inferred user context, the SQL in a fenced
/// block, then either the rows as indented JSON or a "no data" block with
/// suggestions.
pub fn format_results(
    question: &str,
    sql: &str,
    rows: &[Row],
    user_reference: Option<&UserReference>,
) -> String {
    if rows.is_empty() {
        return format!(
            "Question: {question}\nGenerated SQL:\n```sql\n{sql}\n```\nResults: No data found.\n\nSuggestions:\n\u{2022} Try broader search criteria\n\u{2022} Check if specified users/courses exist\n\u{2022} Use 'list_active_users' to see available data"
        );
    }

    let mut parts = vec![format!("Question: {question}")];
    if let Some(user) = user_reference {
        parts.push(format!("User Context: {user}"));
    }
    let rows_json =
        serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string());
    parts.push(format!("Generated SQL:\n```sql\n{sql}\n```"));
    parts.push(format!(
        "Results: ({} rows)\n```json\n{rows_json}\n```",
        rows.len()
    ));
    parts.push("*Generated using Vanna AI*".to_string());
    parts.join("\n")
}
