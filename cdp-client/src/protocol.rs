// CDP protocol definitions and message envelopes
//
// Reference: https://chromedevtools.github.io/devtools-protocol/

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub type CdpResult<T> = Result<T, CdpError>;

#[derive(Debug, Error)]
pub enum CdpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Timeout waiting for {0}")]
    Timeout(String),

    #[error("Connection closed")]
    ConnectionClosed,
}

// Every frame is a single JSON text message:
// command:      {"id": N, "method": "...", "params": {...}}
// reply:        {"id": N, "result": {...}} or {"id": N, "error": {...}}
// notification: {"method": "...", "params": {...}}

#[derive(Debug, Clone, Serialize)]
pub struct CdpRequest {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl CdpRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        // `{}` and null mean "no params" on the wire
        let params = params.filter(|p| !p.is_null() && p != &Value::Object(Default::default()));
        Self {
            id,
            method: method.into(),
            params,
        }
    }

    pub fn encode(&self) -> CdpResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Raw inbound frame before it is classified as reply or notification
#[derive(Debug, Clone, Deserialize)]
struct RawMessage {
    id: Option<u64>,
    result: Option<Value>,
    error: Option<Value>,
    method: Option<String>,
    params: Option<Value>,
}

/// Inbound frame, classified
#[derive(Debug, Clone, PartialEq)]
pub enum CdpMessage {
    Reply { id: u64, reply: CommandReply },
    Notification { method: String, params: Value },
}

impl CdpMessage {
    pub fn decode(text: &str) -> CdpResult<Self> {
        let raw: RawMessage = serde_json::from_str(text)?;

        if let Some(id) = raw.id {
            let reply = match raw.error {
                Some(error) => CommandReply::Failure(error),
                None => CommandReply::Success(raw.result.unwrap_or(Value::Null)),
            };
            return Ok(Self::Reply { id, reply });
        }

        match raw.method {
            Some(method) => Ok(Self::Notification {
                method,
                params: raw.params.unwrap_or(Value::Null),
            }),
            None => Err(CdpError::Protocol(format!(
                "Frame has neither id nor method: {}",
                text
            ))),
        }
    }
}

/// Outcome of a command as reported by the remote end.
///
/// A `Failure` is a well-formed reply carrying the protocol `error` object; it is
/// not a transport error. Callers decide whether a failure is expected.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    Success(Value),
    Failure(Value),
}

impl CommandReply {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }

    /// The `result` payload, or `Value::Null` for a failed reply
    pub fn value(&self) -> &Value {
        match self {
            Self::Success(value) => value,
            Self::Failure(_) => &Value::Null,
        }
    }

    pub fn error(&self) -> Option<&Value> {
        match self {
            Self::Success(_) => None,
            Self::Failure(error) => Some(error),
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error()
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
    }

    /// Decode the `result` payload into a typed structure
    pub fn decode<T: DeserializeOwned>(&self) -> CdpResult<T> {
        match self {
            Self::Success(value) => Ok(serde_json::from_value(value.clone())?),
            Self::Failure(error) => Err(CdpError::Protocol(format!(
                "Cannot decode failed reply: {}",
                error
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_without_params() {
        let request = CdpRequest::new(1, "Debugger.enable", None);
        let json = request.encode().unwrap();

        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"method\":\"Debugger.enable\""));
        assert!(!json.contains("params"));
    }

    #[test]
    fn test_request_empty_object_params_are_dropped() {
        let request = CdpRequest::new(7, "Runtime.enable", Some(json!({})));
        assert!(request.params.is_none());
    }

    #[test]
    fn test_request_with_params() {
        let request = CdpRequest::new(
            2,
            "Debugger.setBreakpointByUrl",
            Some(json!({"url": "http://h/b.cs", "lineNumber": 14})),
        );
        let json = request.encode().unwrap();

        assert!(json.contains("\"params\""));
        assert!(json.contains("\"lineNumber\":14"));
    }

    #[test]
    fn test_decode_success_reply() {
        let message = CdpMessage::decode(r#"{"id":3,"result":{"debuggerId":"abc"}}"#).unwrap();
        match message {
            CdpMessage::Reply { id, reply } => {
                assert_eq!(id, 3);
                assert!(reply.is_ok());
                assert_eq!(reply.value()["debuggerId"], "abc");
            }
            other => panic!("expected reply, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_error_reply() {
        let text = r#"{"id":4,"error":{"code":-32601,"message":"Method not found"}}"#;
        let message = CdpMessage::decode(text).unwrap();
        match message {
            CdpMessage::Reply { reply, .. } => {
                assert!(reply.is_err());
                assert_eq!(reply.error_message(), Some("Method not found"));
                assert_eq!(reply.value(), &Value::Null);
            }
            other => panic!("expected reply, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_notification() {
        let text = r#"{"method":"Debugger.paused","params":{"reason":"other"}}"#;
        let message = CdpMessage::decode(text).unwrap();
        assert_eq!(
            message,
            CdpMessage::Notification {
                method: "Debugger.paused".to_string(),
                params: json!({"reason": "other"}),
            }
        );
    }

    #[test]
    fn test_decode_rejects_frame_without_id_or_method() {
        assert!(matches!(
            CdpMessage::decode(r#"{"params":{}}"#),
            Err(CdpError::Protocol(_))
        ));
    }

    #[test]
    fn test_decode_typed_result() {
        #[derive(Deserialize)]
        struct Answer {
            value: i64,
        }

        let reply = CommandReply::Success(json!({"value": 42}));
        let answer: Answer = reply.decode().unwrap();
        assert_eq!(answer.value, 42);

        let failed = CommandReply::Failure(json!({"message": "nope"}));
        assert!(failed.decode::<Answer>().is_err());
    }
}
