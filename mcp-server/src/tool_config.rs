//! Argument types and catalogue entries for the four exposed tools. Input
//! schemas are generated from the argument structs so the catalogue can
//! never drift from what the handlers actually deserialize.

use mcp_types::Tool;
use mcp_types::ToolInputSchema;
use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryTotaraDbArgs {
    /// Natural-language question about the Totara LMS database.
    pub question: String,
}

pub const DEFAULT_LIST_LIMIT: i64 = 10;
pub const MAX_LIST_LIMIT: i64 = 50;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListActiveUsersArgs {
    /// Maximum number of users to return.
    #[serde(default = "default_list_limit")]
    #[schemars(range(min = 1, max = 50))]
    pub limit: i64,
}

fn default_list_limit() -> i64 {
    DEFAULT_LIST_LIMIT
}

pub fn create_query_totara_db_tool() -> Tool {
    Tool {
        name: "query_totara_db".to_string(),
        description: "Query Totara LMS database".to_string(),
        input_schema: input_schema_for::<QueryTotaraDbArgs>(),
        annotations: None,
    }
}

pub fn create_test_vanna_status_tool() -> Tool {
    Tool {
        name: "test_vanna_status".to_string(),
        description: "Test system status".to_string(),
        input_schema: empty_input_schema(),
        annotations: None,
    }
}

pub fn create_list_active_users_tool() -> Tool {
    Tool {
        name: "list_active_users".to_string(),
        description: "List active users".to_string(),
        input_schema: input_schema_for::<ListActiveUsersArgs>(),
        annotations: None,
    }
}

pub fn create_get_help_tool() -> Tool {
    Tool {
        name: "get_help".to_string(),
        description: "Get usage help".to_string(),
        input_schema: empty_input_schema(),
        annotations: None,
    }
}

fn empty_input_schema() -> ToolInputSchema {
    ToolInputSchema {
        r#type: "object".to_string(),
        properties: Some(json!({})),
        required: None,
    }
}

fn input_schema_for<T: JsonSchema>() -> ToolInputSchema {
    let schema = SchemaSettings::draft2019_09()
        .with(|settings| {
            settings.inline_subschemas = true;
            settings.option_add_null_type = false;
        })
        .into_generator()
        .into_root_schema_for::<T>();

    let value = match serde_json::to_value(&schema) {
        Ok(value) => value,
        Err(e) => {
            // Unreachable for the derive-generated schemas above; fall back
            // to an unconstrained object rather than refuse to start.
            tracing::error!("failed to serialize tool input schema: {e}");
            return empty_input_schema();
        }
    };

    ToolInputSchema {
        r#type: "object".to_string(),
        properties: value.get("properties").cloned(),
        required: value
            .get("required")
            .and_then(|required| serde_json::from_value(required.clone()).ok()),
    }
}
