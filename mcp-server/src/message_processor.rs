use std::sync::Arc;

use mcp_types::CallToolRequest;
use mcp_types::ClientRequest;
use mcp_types::Implementation;
use mcp_types::InitializeRequest;
use mcp_types::InitializeRequestParams;
use mcp_types::JSONRPCError;
use mcp_types::JSONRPCErrorError;
use mcp_types::JSONRPCMessage;
use mcp_types::JSONRPCRequest;
use mcp_types::JSONRPCResponse;
use mcp_types::ListToolsRequest;
use mcp_types::ListToolsResult;
use mcp_types::ModelContextProtocolRequest;
use mcp_types::PingRequest;
use mcp_types::RequestConversionError;
use mcp_types::RequestId;
use mcp_types::ServerCapabilities;
use mcp_types::ServerCapabilitiesTools;
use serde_json::json;

use crate::backend::SqlBackend;
use crate::error_code::INVALID_PARAMS_ERROR_CODE;
use crate::error_code::INVALID_REQUEST_ERROR_CODE;
use crate::error_code::METHOD_NOT_FOUND_ERROR_CODE;
use crate::outgoing_message::OutgoingMessage;
use crate::tools::ToolRouter;
use crate::validation::ValidationConfig;

/// Routes decoded protocol messages to their handlers. Holds the only
/// mutable protocol state the server has: whether `initialize` has been
/// answered yet.
pub struct MessageProcessor {
    router: ToolRouter,
    initialized: bool,
}

impl MessageProcessor {
    pub fn new(backend: Arc<dyn SqlBackend>, validation: ValidationConfig) -> Self {
        Self {
            router: ToolRouter::new(backend, validation),
            initialized: false,
        }
    }

    /// Produce at most one outgoing message for an incoming one. Peer
    /// responses/errors and notifications produce none.
    pub async fn process_message(&mut self, message: JSONRPCMessage) -> Option<OutgoingMessage> {
        match message {
            JSONRPCMessage::Request(request) => self.process_request(request).await,
            JSONRPCMessage::Response(JSONRPCResponse { id, .. }) => {
                tracing::info!("<- unsolicited response for {id:?}");
                None
            }
            JSONRPCMessage::Error(JSONRPCError { error, .. }) => {
                tracing::error!("<- error from peer: {} ({})", error.message, error.code);
                None
            }
        }
    }

    async fn process_request(&mut self, request: JSONRPCRequest) -> Option<OutgoingMessage> {
        if request.method.starts_with("notifications/") {
            tracing::debug!("<- notification: {}", request.method);
            return None;
        }

        // Hold on to the id so the response can echo it (null when absent).
        let request_id = request.id.clone();

        let client_request = match ClientRequest::try_from(request) {
            Ok(client_request) => client_request,
            Err(RequestConversionError::UnknownMethod(method)) => {
                tracing::warn!("unknown method: {method}");
                return Some(OutgoingMessage::Error {
                    id: request_id,
                    error: JSONRPCErrorError {
                        code: METHOD_NOT_FOUND_ERROR_CODE,
                        message: format!("unknown method: {method}"),
                        data: None,
                    },
                });
            }
            Err(e @ RequestConversionError::InvalidParams { .. }) => {
                tracing::warn!("failed to convert request: {e}");
                return Some(OutgoingMessage::Error {
                    id: request_id,
                    error: JSONRPCErrorError {
                        code: INVALID_PARAMS_ERROR_CODE,
                        message: e.to_string(),
                        data: None,
                    },
                });
            }
        };

        match client_request {
            ClientRequest::Initialize(params) => self.handle_initialize(request_id, params),
            ClientRequest::Ping(_) => Self::response::<PingRequest>(request_id, json!({})),
            ClientRequest::ListTools(_) => Self::response::<ListToolsRequest>(
                request_id,
                ListToolsResult {
                    tools: ToolRouter::catalogue(),
                    next_cursor: None,
                },
            ),
            ClientRequest::CallTool(params) => {
                let result = self.router.call(&params.name, params.arguments).await;
                Self::response::<CallToolRequest>(request_id, result)
            }
        }
    }

    fn handle_initialize(
        &mut self,
        id: Option<RequestId>,
        params: InitializeRequestParams,
    ) -> Option<OutgoingMessage> {
        if self.initialized {
            return Some(OutgoingMessage::Error {
                id,
                error: JSONRPCErrorError {
                    code: INVALID_REQUEST_ERROR_CODE,
                    message: "initialize called more than once".to_string(),
                    data: None,
                },
            });
        }
        self.initialized = true;

        let result = mcp_types::InitializeResult {
            capabilities: ServerCapabilities {
                tools: Some(ServerCapabilitiesTools {
                    list_changed: Some(false),
                }),
                ..Default::default()
            },
            instructions: None,
            protocol_version: params.protocol_version,
            server_info: Implementation {
                name: "totara-mcp-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("Totara LMS Query".to_string()),
            },
        };
        Self::response::<InitializeRequest>(id, result)
    }

    fn response<T>(id: Option<RequestId>, result: T::Result) -> Option<OutgoingMessage>
    where
        T: ModelContextProtocolRequest,
    {
        match serde_json::to_value(result) {
            Ok(result) => Some(OutgoingMessage::Response { id, result }),
            Err(e) => Some(OutgoingMessage::internal_error(
                id,
                format!("failed to serialize response: {e}"),
            )),
        }
    }
}
