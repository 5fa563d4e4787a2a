// Runtime domain commands
//
// Evaluation and remote object inspection

use crate::commands::{runtime_commands, Command, NoReturns};
use crate::types::{PropertyDescriptor, RemoteObject, RemoteObjectId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Enable;

impl Command for Enable {
    const METHOD: &'static str = runtime_commands::ENABLE;
    type Returns = NoReturns;
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RunIfWaitingForDebugger;

impl Command for RunIfWaitingForDebugger {
    const METHOD: &'static str = runtime_commands::RUN_IF_WAITING_FOR_DEBUGGER;
    type Returns = NoReturns;
}

/// Runtime.evaluate
#[derive(Debug, Clone, Serialize)]
pub struct Evaluate {
    pub expression: String,
}

impl Evaluate {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateReturns {
    pub result: RemoteObject,
    #[serde(default)]
    pub exception_details: Option<Value>,
}

impl Command for Evaluate {
    const METHOD: &'static str = runtime_commands::EVALUATE;
    type Returns = EvaluateReturns;
}

/// Runtime.getProperties.
///
/// The object id may also be a call frame id, in which case the frame locals are returned.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetProperties {
    pub object_id: RemoteObjectId,
}

impl GetProperties {
    pub fn new(object_id: impl Into<RemoteObjectId>) -> Self {
        Self {
            object_id: object_id.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetPropertiesReturns {
    #[serde(default)]
    pub result: Vec<PropertyDescriptor>,
}

impl Command for GetProperties {
    const METHOD: &'static str = runtime_commands::GET_PROPERTIES;
    type Returns = GetPropertiesReturns;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_properties_params() {
        let cmd = GetProperties::new("dotnet:scope:0");
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({"objectId": "dotnet:scope:0"})
        );
    }

    #[test]
    fn test_get_properties_returns() {
        let returns: GetPropertiesReturns = serde_json::from_value(json!({
            "result": [
                {"name": "count", "value": {"type": "number", "value": 30}},
                {"name": "dt", "value": {"type": "object", "objectId": "dotnet:object:1"}}
            ]
        }))
        .unwrap();

        assert_eq!(returns.result.len(), 2);
        assert_eq!(returns.result[1].name, "dt");
        assert!(returns.result[1].value.as_ref().unwrap().is_reference());
    }

    #[test]
    fn test_evaluate_params() {
        let cmd = Evaluate::new("window.setTimeout(function() { sleep_test(); }, 1);");
        let params = serde_json::to_value(&cmd).unwrap();
        assert_eq!(params["expression"], "window.setTimeout(function() { sleep_test(); }, 1);");
    }
}
