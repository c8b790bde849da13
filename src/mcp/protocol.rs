//! JSON-RPC 2.0 message types for MCP protocol.
//!
//! This module defines the envelopes exchanged with tool-invocation clients
//! and the validation applied to every incoming line or HTTP body.
//!
//! # Message Types
//!
//! - **Request**: A message expecting a response (has `id`)
//! - **Response**: A reply to a request (success or error)
//! - **Notification**: A one-way `notifications/*` message (no `id`, no response)
//!
//! # Envelope Constraints
//!
//! - The version field must be `"2.0"`. It may be named `jsonrpc` or
//!   `protocolVersion`; responses use the name the request used.
//! - Request IDs must be strings or numbers (never `null`, never absent).
//! - Every response echoes the request ID whenever it can be derived, even
//!   when the envelope itself is rejected.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Number, Value};

/// The only JSON-RPC envelope version accepted.
pub const JSONRPC_VERSION: &str = "2.0";

/// The MCP protocol version reported by `initialize`.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "doc-corpus-mcp";

/// Prefix of methods that may be sent without an `id`.
const NOTIFICATION_PREFIX: &str = "notifications/";

/// A JSON-RPC 2.0 request ID.
///
/// IDs must be strings or numbers, never `null`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Integer request ID.
    Number(i64),
    /// String request ID.
    String(String),
    /// Fractional or out-of-range numeric ID, echoed exactly as received.
    OtherNumber(Number),
}

impl RequestId {
    /// Derives a request ID from a raw JSON value, if it has a legal shape.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(
                n.as_i64()
                    .map_or_else(|| Self::OtherNumber(n.clone()), Self::Number),
            ),
            Value::String(s) => Some(Self::String(s.clone())),
            _ => None,
        }
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::OtherNumber(n) => write!(f, "{n}"),
        }
    }
}

/// The key that carries the envelope version.
///
/// Requests may use either key. Replies use the one the request used, and
/// `jsonrpc` when the request could not be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersionField {
    /// `"jsonrpc": "2.0"`.
    #[default]
    JsonRpc,
    /// `"protocolVersion": "2.0"`.
    ProtocolVersion,
}

impl VersionField {
    /// The JSON key this variant names.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::JsonRpc => "jsonrpc",
            Self::ProtocolVersion => "protocolVersion",
        }
    }

    /// Picks the key present on a raw envelope. `jsonrpc` wins when both are.
    fn detect(envelope: &Map<String, Value>) -> Self {
        if !envelope.contains_key("jsonrpc") && envelope.contains_key("protocolVersion") {
            Self::ProtocolVersion
        } else {
            Self::JsonRpc
        }
    }
}

// Flattened into the envelope as a single `key: "2.0"` entry.
impl Serialize for VersionField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let index = match self {
            Self::JsonRpc => 0,
            Self::ProtocolVersion => 1,
        };
        serializer.serialize_newtype_variant("VersionField", index, self.key(), JSONRPC_VERSION)
    }
}

/// A JSON-RPC 2.0 request message.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// Must be "2.0".
    #[serde(alias = "protocolVersion")]
    pub jsonrpc: String,

    /// Unique request identifier.
    pub id: RequestId,

    /// The method to invoke.
    pub method: String,

    /// Optional parameters for the method.
    #[serde(default)]
    pub params: Option<Value>,

    /// Which key carried the version, so the reply can use the same one.
    #[serde(skip)]
    pub version_field: VersionField,
}

impl JsonRpcRequest {
    /// Builds a request in code, mainly for embedding and tests.
    #[must_use]
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
            version_field: VersionField::default(),
        }
    }

    /// Validates that this is a well-formed JSON-RPC 2.0 request.
    ///
    /// Returns an error message if validation fails.
    #[must_use]
    pub fn validate(&self) -> Option<&'static str> {
        if self.jsonrpc != JSONRPC_VERSION {
            return Some("jsonrpc field must be \"2.0\"");
        }
        if self.method.is_empty() {
            return Some("method field cannot be empty");
        }
        None
    }
}

/// A JSON-RPC 2.0 notification message (incoming).
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcNotification {
    /// Must be "2.0".
    #[serde(alias = "protocolVersion")]
    pub jsonrpc: String,

    /// The notification method.
    pub method: String,

    /// Optional parameters for the notification.
    #[serde(default)]
    pub params: Option<Value>,
}

/// A successful JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Version key, always carrying "2.0".
    #[serde(flatten)]
    pub version: VersionField,

    /// The request ID this response corresponds to.
    pub id: RequestId,

    /// The result of the method call.
    pub result: Value,
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            version: VersionField::default(),
            id,
            result,
        }
    }

    /// Replies under the given version key.
    #[must_use]
    pub fn with_version_field(mut self, version: VersionField) -> Self {
        self.version = version;
        self
    }
}

/// JSON-RPC 2.0 error codes used by this server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The envelope is malformed (bad version or missing `id`).
    InvalidRequest,
    /// Unknown top-level method or unknown tool name.
    MethodNotFound,
    /// Missing or invalid call parameters.
    InvalidParams,
    /// A tool handler failed.
    InternalError,
    /// Server-defined error.
    ServerError(i32),
}

impl ErrorCode {
    /// Server-defined code returned when a caller exceeds its rate limit.
    pub const RATE_LIMITED: Self = Self::ServerError(-32029);

    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ServerError(code) => code,
        }
    }

    /// Returns the default message for this error code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::ServerError(_) => "Server error",
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,

    /// Additional information about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorData {
    /// Creates a new error from an error code.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.default_message().to_string(),
            data: None,
        }
    }

    /// Creates a new error with a custom message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Adds additional data to the error.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// A JSON-RPC 2.0 error response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Version key, always carrying "2.0".
    #[serde(flatten)]
    pub version: VersionField,

    /// The request ID this error corresponds to (if known).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    /// The error details.
    pub error: JsonRpcErrorData,
}

impl JsonRpcError {
    /// Creates a new error response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // JsonRpcErrorData contains String
    pub fn new(id: Option<RequestId>, error: JsonRpcErrorData) -> Self {
        Self {
            version: VersionField::default(),
            id,
            error,
        }
    }

    /// Replies under the given version key.
    #[must_use]
    pub fn with_version_field(mut self, version: VersionField) -> Self {
        self.version = version;
        self
    }

    /// Creates a parse error response (ID cannot be determined).
    #[must_use]
    pub fn parse_error() -> Self {
        Self::new(None, JsonRpcErrorData::from_code(ErrorCode::ParseError))
    }

    /// Creates an invalid request error response.
    #[must_use]
    pub fn invalid_request(id: Option<RequestId>) -> Self {
        Self::new(id, JsonRpcErrorData::from_code(ErrorCode::InvalidRequest))
    }

    /// Creates an invalid request error response with a specific reason.
    #[must_use]
    pub fn invalid_request_with(id: Option<RequestId>, message: impl Into<String>) -> Self {
        Self::new(
            id,
            JsonRpcErrorData::with_message(ErrorCode::InvalidRequest, message),
        )
    }

    /// Creates a method not found error response.
    #[must_use]
    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::new(
            Some(id),
            JsonRpcErrorData::with_message(
                ErrorCode::MethodNotFound,
                format!("Method not found: {method}"),
            ),
        )
    }

    /// Creates an unknown tool error response carrying "did you mean" suggestions.
    #[must_use]
    pub fn tool_not_found(id: RequestId, name: &str, suggestions: &[String]) -> Self {
        let message = if suggestions.is_empty() {
            format!("Tool not found: {name}")
        } else {
            format!(
                "Tool not found: {name}. Did you mean: {}?",
                suggestions.join(", ")
            )
        };
        Self::new(
            Some(id),
            JsonRpcErrorData::with_message(ErrorCode::MethodNotFound, message)
                .with_data(json!({ "suggestions": suggestions })),
        )
    }

    /// Creates an invalid params error response.
    #[must_use]
    pub fn invalid_params(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(
            Some(id),
            JsonRpcErrorData::with_message(ErrorCode::InvalidParams, message),
        )
    }

    /// Creates an internal error response.
    #[must_use]
    pub fn internal_error(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(
            Some(id),
            JsonRpcErrorData::with_message(ErrorCode::InternalError, message),
        )
    }

    /// Creates a rate-limited error response.
    #[must_use]
    pub fn rate_limited(id: Option<RequestId>, reset_in_secs: u64) -> Self {
        Self::new(
            id,
            JsonRpcErrorData::with_message(
                ErrorCode::RATE_LIMITED,
                format!("Rate limit exceeded, retry in {reset_in_secs}s"),
            )
            .with_data(json!({ "retryAfterSecs": reset_in_secs })),
        )
    }
}

/// Either half of the response envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OutgoingMessage {
    /// `{jsonrpc, id, result}`.
    Response(JsonRpcResponse),
    /// `{jsonrpc, id?, error}`.
    Error(JsonRpcError),
}

impl OutgoingMessage {
    /// Returns the echoed request ID, if any.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Response(resp) => Some(&resp.id),
            Self::Error(err) => err.id.as_ref(),
        }
    }

    /// Replies under the given version key.
    #[must_use]
    pub fn with_version_field(self, version: VersionField) -> Self {
        match self {
            Self::Response(resp) => Self::Response(resp.with_version_field(version)),
            Self::Error(err) => Self::Error(err.with_version_field(version)),
        }
    }

    /// Returns the error code when this is an error response.
    #[must_use]
    pub const fn error_code(&self) -> Option<i32> {
        match self {
            Self::Response(_) => None,
            Self::Error(err) => Some(err.error.code),
        }
    }
}

impl From<JsonRpcResponse> for OutgoingMessage {
    fn from(resp: JsonRpcResponse) -> Self {
        Self::Response(resp)
    }
}

impl From<JsonRpcError> for OutgoingMessage {
    fn from(err: JsonRpcError) -> Self {
        Self::Error(err)
    }
}

/// An incoming message that could be either a request or notification.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// A request expecting a response.
    Request(JsonRpcRequest),
    /// A notification (no response expected).
    Notification(JsonRpcNotification),
}

impl IncomingMessage {
    /// Returns the method name of this message.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::Request(req) => &req.method,
            Self::Notification(notif) => &notif.method,
        }
    }

    /// Returns the request ID if this is a request.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Request(req) => Some(&req.id),
            Self::Notification(_) => None,
        }
    }
}

/// Extracts the request ID from raw input without validating anything else.
///
/// Used by transports that must echo an ID on errors raised before dispatch.
#[must_use]
pub fn peek_id(json: &str) -> Option<RequestId> {
    let value: Value = serde_json::from_str(json).ok()?;
    value.get("id").and_then(RequestId::from_value)
}

/// Reads which version key raw input uses, without validating anything else.
#[must_use]
pub fn peek_version_field(json: &str) -> VersionField {
    serde_json::from_str::<Value>(json)
        .ok()
        .as_ref()
        .and_then(Value::as_object)
        .map(VersionField::detect)
        .unwrap_or_default()
}

/// Parses and validates a JSON string into an incoming message.
///
/// # Errors
///
/// Returns a `JsonRpcError` if the JSON is malformed or the envelope is not
/// valid. The error echoes the request ID whenever it can be derived.
pub fn parse_message(json: &str) -> Result<IncomingMessage, JsonRpcError> {
    let value: Value = serde_json::from_str(json).map_err(|_| JsonRpcError::parse_error())?;

    let Some(obj) = value.as_object() else {
        return Err(JsonRpcError::invalid_request_with(
            None,
            "Invalid Request: expected a JSON object",
        ));
    };

    let derived_id = obj.get("id").and_then(RequestId::from_value);
    let version_field = VersionField::detect(obj);

    let version = obj.get(version_field.key()).and_then(Value::as_str);
    if version != Some(JSONRPC_VERSION) {
        return Err(JsonRpcError::invalid_request_with(
            derived_id,
            "Invalid Request: unsupported protocol version",
        )
        .with_version_field(version_field));
    }

    let is_notification = obj
        .get("method")
        .and_then(Value::as_str)
        .is_some_and(|m| m.starts_with(NOTIFICATION_PREFIX));
    let id_field = obj.get("id").cloned();

    match id_field {
        None if is_notification => {
            let notification: JsonRpcNotification = serde_json::from_value(value).map_err(|_| {
                JsonRpcError::invalid_request(None).with_version_field(version_field)
            })?;
            Ok(IncomingMessage::Notification(notification))
        }
        None | Some(Value::Null) => Err(JsonRpcError::invalid_request_with(
            None,
            "Invalid Request: id is required and must not be null",
        )
        .with_version_field(version_field)),
        Some(_) if derived_id.is_none() => Err(JsonRpcError::invalid_request_with(
            None,
            "Invalid Request: id must be a string or a number",
        )
        .with_version_field(version_field)),
        Some(_) => {
            let mut request: JsonRpcRequest = serde_json::from_value(value).map_err(|_| {
                JsonRpcError::invalid_request(derived_id.clone()).with_version_field(version_field)
            })?;
            request.version_field = version_field;

            if let Some(reason) = request.validate() {
                return Err(JsonRpcError::invalid_request_with(
                    Some(request.id),
                    format!("Invalid Request: {reason}"),
                )
                .with_version_field(version_field));
            }

            Ok(IncomingMessage::Request(request))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_request() {
        let json = r#"{"jsonrpc": "2.0", "id": 1, "method": "tools/list", "params": {}}"#;
        let msg = parse_message(json).unwrap();

        let IncomingMessage::Request(req) = msg else {
            panic!("Expected Request, got Notification");
        };
        assert_eq!(req.id, RequestId::Number(1));
        assert_eq!(req.method, "tools/list");
    }

    #[test]
    fn parse_protocol_version_alias() {
        let json = r#"{"protocolVersion": "2.0", "id": "a", "method": "tools/list"}"#;
        let msg = parse_message(json).unwrap();
        assert_eq!(msg.id(), Some(&RequestId::String("a".to_string())));
    }

    #[test]
    fn fractional_id_is_kept() {
        let json = r#"{"jsonrpc": "2.0", "id": 1.5, "method": "ping"}"#;
        let msg = parse_message(json).unwrap();
        let id = msg.id().unwrap().clone();
        assert!(matches!(id, RequestId::OtherNumber(_)));
        assert_eq!(serde_json::to_value(&id).unwrap(), json!(1.5));
    }

    #[test]
    fn id_beyond_i64_is_kept() {
        let json = r#"{"jsonrpc": "2.0", "id": 18446744073709551615, "method": "ping"}"#;
        let msg = parse_message(json).unwrap();
        let id = msg.id().unwrap().clone();
        assert_eq!(serde_json::to_value(&id).unwrap(), json!(u64::MAX));
        assert_eq!(id.to_string(), "18446744073709551615");
    }

    #[test]
    fn rejected_envelope_echoes_fractional_id() {
        let json = r#"{"jsonrpc": "1.0", "id": 2.5, "method": "ping"}"#;
        let err = parse_message(json).unwrap_err();
        assert_eq!(serde_json::to_value(&err).unwrap()["id"], json!(2.5));
    }

    #[test]
    fn version_field_follows_request() {
        let json = r#"{"protocolVersion": "2.0", "id": 1, "method": "ping"}"#;
        let IncomingMessage::Request(req) = parse_message(json).unwrap() else {
            panic!("Expected Request");
        };
        assert_eq!(req.version_field, VersionField::ProtocolVersion);

        let response = JsonRpcResponse::success(req.id, json!({}))
            .with_version_field(req.version_field);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["protocolVersion"], json!("2.0"));
        assert!(value.get("jsonrpc").is_none());
    }

    #[test]
    fn rejected_alias_envelope_keeps_alias() {
        let json = r#"{"protocolVersion": "1.0", "id": 4, "method": "ping"}"#;
        let err = parse_message(json).unwrap_err();
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["protocolVersion"], json!("2.0"));
        assert_eq!(value["id"], json!(4));
    }

    #[test]
    fn peek_version_field_defaults_to_jsonrpc() {
        assert_eq!(peek_version_field("garbage"), VersionField::JsonRpc);
        assert_eq!(
            peek_version_field(r#"{"protocolVersion": "2.0"}"#),
            VersionField::ProtocolVersion
        );
    }

    #[test]
    fn parse_valid_notification() {
        let json = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;
        let msg = parse_message(json).unwrap();

        let IncomingMessage::Notification(notif) = msg else {
            panic!("Expected Notification, got Request");
        };
        assert_eq!(notif.method, "notifications/initialized");
    }

    #[test]
    fn missing_id_is_invalid_request() {
        let json = r#"{"jsonrpc": "2.0", "method": "tools/list"}"#;
        let err = parse_message(json).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
        assert!(err.id.is_none());
    }

    #[test]
    fn null_id_is_invalid_request() {
        let json = r#"{"jsonrpc": "2.0", "id": null, "method": "tools/list"}"#;
        let err = parse_message(json).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn object_id_is_invalid_request() {
        let json = r#"{"jsonrpc": "2.0", "id": {"x": 1}, "method": "tools/list"}"#;
        let err = parse_message(json).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn wrong_version_echoes_id() {
        let json = r#"{"jsonrpc": "1.0", "id": 7, "method": "tools/list"}"#;
        let err = parse_message(json).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
        assert_eq!(err.id, Some(RequestId::Number(7)));
    }

    #[test]
    fn missing_method_echoes_id() {
        let json = r#"{"jsonrpc": "2.0", "id": "x"}"#;
        let err = parse_message(json).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
        assert_eq!(err.id, Some(RequestId::String("x".to_string())));
    }

    #[test]
    fn parse_invalid_json() {
        let err = parse_message("not valid json").unwrap_err();
        assert_eq!(err.error.code, ErrorCode::ParseError.code());
    }

    #[test]
    fn non_object_is_invalid_request() {
        let err = parse_message("[1, 2]").unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn peek_id_reads_numeric_and_string_ids() {
        assert_eq!(peek_id(r#"{"id": 3}"#), Some(RequestId::Number(3)));
        assert_eq!(
            peek_id(r#"{"id": "q"}"#),
            Some(RequestId::String("q".to_string()))
        );
        assert_eq!(peek_id("garbage"), None);
    }

    #[test]
    fn serialise_success_response() {
        let response =
            JsonRpcResponse::success(RequestId::Number(1), serde_json::json!({"ok": true}));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""result":{"ok":true}"#));
    }

    #[test]
    fn serialise_tool_not_found_with_suggestions() {
        let error = JsonRpcError::tool_not_found(
            RequestId::Number(1),
            "serch_docs",
            &["search_docs".to_string()],
        );
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains(r#""code":-32601"#));
        assert!(json.contains("serch_docs"));
        assert!(json.contains(r#""suggestions":["search_docs"]"#));
    }

    #[test]
    fn request_id_display() {
        assert_eq!(format!("{}", RequestId::Number(42)), "42");
        assert_eq!(format!("{}", RequestId::String("abc".to_string())), "abc");
    }
}
