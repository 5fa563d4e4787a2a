// CDP type definitions
//
// Common types used across the Debugger and Runtime domains

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type ScriptId = String;
pub type RemoteObjectId = String;
pub type CallFrameId = String;
pub type BreakpointId = String;

// Location identifies a code position inside a parsed script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub script_id: ScriptId,
    pub line_number: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_number: Option<i64>,
}

impl Location {
    pub fn new(script_id: impl Into<ScriptId>, line_number: i64, column_number: i64) -> Self {
        Self {
            script_id: script_id.into(),
            line_number,
            column_number: Some(column_number),
        }
    }
}

// Stack frame as reported in Debugger.paused
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    pub call_frame_id: CallFrameId,
    pub function_name: String,
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub scope_chain: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub this: Option<RemoteObject>,
}

/// A mirror of a remote value.
///
/// Inline values carry `type`/`value`; references carry an `objectId` that must be
/// expanded with `Runtime.getProperties`. Runtimes add their own fields
/// (`className`, `isValueType`, `isEnum`, ...), so the payload is kept as an open map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteObject {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RemoteObject {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn type_name(&self) -> Option<&str> {
        self.get_str("type")
    }

    pub fn subtype(&self) -> Option<&str> {
        self.get_str("subtype")
    }

    pub fn class_name(&self) -> Option<&str> {
        self.get_str("className")
    }

    pub fn description(&self) -> Option<&str> {
        self.get_str("description")
    }

    pub fn value(&self) -> Option<&Value> {
        self.get("value")
    }

    pub fn object_id(&self) -> Option<&str> {
        self.get_str("objectId")
    }

    pub fn is_reference(&self) -> bool {
        self.object_id().is_some()
    }

    /// Boolean flag, absent meaning `false`
    pub fn flag(&self, field: &str) -> bool {
        self.get(field).and_then(Value::as_bool).unwrap_or(false)
    }
}

impl From<Map<String, Value>> for RemoteObject {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

// One entry of a Runtime.getProperties result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<RemoteObject>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
