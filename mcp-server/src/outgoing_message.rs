use mcp_types::JSONRPC_VERSION;
use mcp_types::JSONRPCError;
use mcp_types::JSONRPCErrorError;
use mcp_types::JSONRPCMessage;
use mcp_types::JSONRPCResponse;
use mcp_types::RequestId;
use serde_json::Value;

use crate::error_code::INTERNAL_ERROR_CODE;

/// A message the serve loop still has to write to the protocol stream.
/// Exactly one is produced per dispatched request; notifications and
/// unparseable lines produce none.
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingMessage {
    Response {
        id: Option<RequestId>,
        result: Value,
    },
    Error {
        id: Option<RequestId>,
        error: JSONRPCErrorError,
    },
}

impl OutgoingMessage {
    pub fn internal_error(id: Option<RequestId>, message: String) -> Self {
        Self::Error {
            id,
            error: JSONRPCErrorError {
                code: INTERNAL_ERROR_CODE,
                message,
                data: None,
            },
        }
    }
}

impl From<OutgoingMessage> for JSONRPCMessage {
    fn from(message: OutgoingMessage) -> Self {
        match message {
            OutgoingMessage::Response { id, result } => Self::Response(JSONRPCResponse {
                jsonrpc: JSONRPC_VERSION.to_string(),
                id,
                result,
            }),
            OutgoingMessage::Error { id, error } => Self::Error(JSONRPCError {
                jsonrpc: JSONRPC_VERSION.to_string(),
                id,
                error,
            }),
        }
    }
}
