// Debugger domain commands
//
// Breakpoints and execution control

use crate::commands::{debugger_commands, Command, NoReturns};
use crate::types::{BreakpointId, Location};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Enable;

impl Command for Enable {
    const METHOD: &'static str = debugger_commands::ENABLE;
    type Returns = NoReturns;
}

/// Debugger.setBreakpointByUrl
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointByUrl {
    pub line_number: i64,
    pub column_number: i64,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointByUrlReturns {
    pub breakpoint_id: BreakpointId,
    #[serde(default)]
    pub locations: Vec<Location>,
}

impl Command for SetBreakpointByUrl {
    const METHOD: &'static str = debugger_commands::SET_BREAKPOINT_BY_URL;
    type Returns = SetBreakpointByUrlReturns;
}

/// Step granularity for Debugger.step*
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Into,
    Over,
    Out,
}

impl StepKind {
    pub fn method(self) -> &'static str {
        match self {
            Self::Into => debugger_commands::STEP_INTO,
            Self::Over => debugger_commands::STEP_OVER,
            Self::Out => debugger_commands::STEP_OUT,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Resume;

impl Command for Resume {
    const METHOD: &'static str = debugger_commands::RESUME;
    type Returns = NoReturns;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_breakpoint_params() {
        let cmd = SetBreakpointByUrl {
            line_number: 14,
            column_number: 8,
            url: "http://h/b.cs".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({"lineNumber": 14, "columnNumber": 8, "url": "http://h/b.cs"})
        );
    }

    #[test]
    fn test_set_breakpoint_returns() {
        let returns: SetBreakpointByUrlReturns = serde_json::from_value(json!({
            "breakpointId": "dotnet:0",
            "locations": [{"scriptId": "dotnet://t.dll/t.cs", "lineNumber": 14, "columnNumber": 8}]
        }))
        .unwrap();
        assert_eq!(returns.breakpoint_id, "dotnet:0");
        assert_eq!(returns.locations.len(), 1);
    }

    #[test]
    fn test_unit_commands_have_no_params() {
        assert!(serde_json::to_value(Enable).unwrap().is_null());
        assert!(serde_json::to_value(Resume).unwrap().is_null());
    }

    #[test]
    fn test_step_methods() {
        assert_eq!(StepKind::Into.method(), "Debugger.stepInto");
        assert_eq!(StepKind::Over.method(), "Debugger.stepOver");
        assert_eq!(StepKind::Out.method(), "Debugger.stepOut");
    }
}
