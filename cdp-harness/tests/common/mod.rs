// Shared fixtures: a mock endpoint that announces one synthetic and one plain script
// and reports the runtime ready after setup.

#![allow(dead_code)]

use cdp_client::mock::MockCdpServer;
use cdp_harness::HarnessConfig;
use serde_json::{json, Value};
use std::time::Duration;

pub const SOURCE: &str = "dotnet://threaded-debugger-test.dll/threaded-debugger-test.cs";
pub const SCRIPT_ID: &str = "dotnet://threaded-debugger-test.dll/0";
pub const SCRIPT_URL: &str = "http://localhost:9400/threaded-debugger-test.cs";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn endpoint() -> MockCdpServer {
    init_tracing();
    let server = MockCdpServer::spawn().await.unwrap();
    announce_scripts(&server);
    server.notify_after("Runtime.runIfWaitingForDebugger", "Mono.runtimeReady", json!({}));
    server
}

pub fn announce_scripts(server: &MockCdpServer) {
    server.notify_on_connect(
        "Debugger.scriptParsed",
        json!({"scriptId": "12", "url": "http://localhost:9400/debugger-driver.js"}),
    );
    server.notify_on_connect(
        "Debugger.scriptParsed",
        json!({"scriptId": SCRIPT_ID, "url": SCRIPT_URL, "dotNetUrl": SOURCE}),
    );
}

pub fn config(server: &MockCdpServer) -> HarnessConfig {
    HarnessConfig::default()
        .with_endpoint(server.url())
        .with_timeout(Duration::from_secs(10))
}

pub fn location(line: i64, column: i64) -> Value {
    json!({"scriptId": SCRIPT_ID, "lineNumber": line, "columnNumber": column})
}

/// A `Debugger.paused` payload with a single frame
pub fn paused_at(function_name: &str, line: i64, column: i64) -> Value {
    json!({
        "reason": "other",
        "hitBreakpoints": ["dotnet:0"],
        "callFrames": [{
            "callFrameId": "dotnet:scope:0",
            "functionName": function_name,
            "location": location(line, column),
            "functionLocation": location(4, 33),
            "url": SCRIPT_URL,
            "scopeChain": []
        }]
    })
}
