// CDP command and notification names
//
// Only the subset the harness drives is listed here

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A typed protocol command: its parameters serialize to `params`,
/// its `result` payload decodes into `Returns`.
pub trait Command: Serialize {
    const METHOD: &'static str;
    type Returns: DeserializeOwned;
}

/// Empty `result` payload
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct NoReturns {}

pub mod debugger_commands {
    pub const ENABLE: &str = "Debugger.enable";
    pub const SET_BREAKPOINT_BY_URL: &str = "Debugger.setBreakpointByUrl";
    pub const STEP_INTO: &str = "Debugger.stepInto";
    pub const STEP_OVER: &str = "Debugger.stepOver";
    pub const STEP_OUT: &str = "Debugger.stepOut";
    pub const RESUME: &str = "Debugger.resume";
}

pub mod runtime_commands {
    pub const ENABLE: &str = "Runtime.enable";
    pub const EVALUATE: &str = "Runtime.evaluate";
    pub const GET_PROPERTIES: &str = "Runtime.getProperties";
    pub const RUN_IF_WAITING_FOR_DEBUGGER: &str = "Runtime.runIfWaitingForDebugger";
}

pub mod profiler_commands {
    pub const ENABLE: &str = "Profiler.enable";
}

pub mod notifications {
    pub const SCRIPT_PARSED: &str = "Debugger.scriptParsed";
    pub const PAUSED: &str = "Debugger.paused";
    pub const RESUMED: &str = "Debugger.resumed";
    pub const CONSOLE_API_CALLED: &str = "Runtime.consoleAPICalled";
    pub const EXCEPTION_THROWN: &str = "Runtime.exceptionThrown";
}
