// CDP notification handling
//
// Notifications are sent unsolicited by the remote end: script parsing, pauses, console output...

use crate::commands::notifications;
use crate::protocol::CdpResult;
use crate::types::{BreakpointId, CallFrame, RemoteObject, ScriptId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// A notification exactly as delivered by the channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Parse the params of well-known notifications into typed events
    pub fn parse(&self) -> CdpResult<Event> {
        let params = self.params.clone();
        let event = match self.method.as_str() {
            notifications::SCRIPT_PARSED => Event::ScriptParsed(serde_json::from_value(params)?),
            notifications::PAUSED => Event::Paused(serde_json::from_value(params)?),
            notifications::CONSOLE_API_CALLED => {
                Event::ConsoleApiCalled(serde_json::from_value(params)?)
            }
            notifications::EXCEPTION_THROWN => {
                Event::ExceptionThrown(serde_json::from_value(params)?)
            }
            _ => Event::Other {
                method: self.method.clone(),
                params,
            },
        };
        Ok(event)
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    ScriptParsed(ScriptParsed),
    Paused(Paused),
    ConsoleApiCalled(ConsoleApiCalled),
    ExceptionThrown(ExceptionThrown),
    Other { method: String, params: Value },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptParsed {
    pub script_id: ScriptId,
    #[serde(default)]
    pub url: String,
    /// Logical source url for scripts synthesized by the .NET debugger proxy
    #[serde(default, rename = "dotNetUrl", skip_serializing_if = "Option::is_none")]
    pub dot_net_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paused {
    #[serde(default)]
    pub call_frames: Vec<CallFrame>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub hit_breakpoints: Vec<BreakpointId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Paused {
    pub fn top_frame(&self) -> Option<&CallFrame> {
        self.call_frames.first()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleApiCalled {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub args: Vec<RemoteObject>,
}

impl ConsoleApiCalled {
    /// The printable text of the first argument, if any
    pub fn first_arg_text(&self) -> Option<String> {
        let first = self.args.first()?;
        match first.value().or_else(|| first.get("description")) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionThrown {
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub exception_details: Value,
}

impl ExceptionThrown {
    pub fn text(&self) -> String {
        match self.exception_details.get("text").and_then(Value::as_str) {
            Some(text) => text.to_string(),
            None => {
                warn!("exceptionThrown without text");
                self.exception_details.to_string()
            }
        }
    }
}
