// Evaluate, step and locals inspection against a loopback endpoint

mod common;

use cdp_client::debugger::StepKind;
use cdp_client::mock::MockCdpServer;
use cdp_client::Notification;
use cdp_harness::checks::{check_number, check_value_type};
use cdp_harness::{
    check_location, Expected, ExpectedLocation, HarnessError, Inspector, PauseCheck, ScriptTable,
};
use common::{config, endpoint, paused_at, SOURCE};
use serde_json::json;

const SLEEP_TEST: &str = "window.setTimeout(function() { sleep_test(); }, 1);";

fn serve_locals(server: &MockCdpServer, count: i64) {
    server.respond("Runtime.getProperties", move |params| {
        match params["objectId"].as_str() {
            Some("dotnet:scope:0") => Ok(json!({"result": [
                {"name": "count", "value": {"type": "number", "value": count}},
                {"name": "dt", "value": {"type": "object", "className": "System.DateTime",
                                         "isValueType": true, "objectId": "dotnet:valuetype:1"}},
                {"name": "arr", "value": {"type": "object", "subtype": "array", "className": "int[]",
                                          "objectId": "dotnet:array:2"}}
            ]})),
            Some("dotnet:valuetype:1") => Ok(json!({"result": [
                {"name": "Year", "value": {"type": "number", "value": 2020}},
                {"name": "Month", "value": {"type": "number", "value": 1}}
            ]})),
            Some("dotnet:array:2") => Ok(json!({"result": [
                {"name": "[0]", "value": {"type": "number", "value": 10}},
                {"name": "[1]", "value": {"type": "number", "value": 20}}
            ]})),
            _ => Err(json!({"message": "unknown object"})),
        }
    });
}

#[tokio::test]
async fn evaluate_pauses_and_locals_match() {
    let server = endpoint().await;
    server.notify_after("Runtime.evaluate", "Debugger.paused", paused_at("SleepTest", 14, 8));
    serve_locals(&server, 30);

    let inspector = Inspector::new();
    let scripts = ScriptTable::subscribe(&inspector);
    inspector
        .ready_with(&config(&server), scripts, |ctx| async move {
            let table = ctx.scripts().clone();
            let check = PauseCheck::new()
                .at(SOURCE, 14, 8)
                .in_function("SleepTest")
                .on_pause(move |paused| {
                    assert_eq!(paused.reason, "other");
                    assert_eq!(paused.hit_breakpoints, vec!["dotnet:0"]);
                    let top = paused.top_frame().unwrap();
                    assert!(top.url.as_deref().unwrap().contains("threaded-debugger-test.cs"));
                    check_location(
                        &ExpectedLocation::new(SOURCE, 4, 33),
                        top.function_location.as_ref().unwrap(),
                        &table,
                    )
                })
                .with_locals(json!({
                    "count": 30,
                    "dt": {"Year": 2020, "Month": 1},
                    "arr": [10, 20]
                }));

            let paused = ctx.evaluate_and_check(SLEEP_TEST, &check).await?;
            assert_eq!(paused.call_frames.len(), 1);
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(
        server.received("Runtime.evaluate"),
        vec![json!({"expression": SLEEP_TEST})]
    );
    // frame locals, the DateTime and the array: nothing else
    let mut fetched: Vec<_> = server
        .received("Runtime.getProperties")
        .into_iter()
        .map(|p| p["objectId"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(fetched[0], "dotnet:scope:0");
    fetched.sort();
    assert_eq!(fetched, vec!["dotnet:array:2", "dotnet:scope:0", "dotnet:valuetype:1"]);
}

#[tokio::test]
async fn locals_mismatch_names_the_field() {
    let server = endpoint().await;
    server.notify_after("Runtime.evaluate", "Debugger.paused", paused_at("SleepTest", 14, 8));
    serve_locals(&server, 31);

    let inspector = Inspector::new();
    let scripts = ScriptTable::subscribe(&inspector);
    let err = inspector
        .ready_with(&config(&server), scripts, |ctx| async move {
            // the shape check stops at `count`, before anything is expanded
            let check = PauseCheck::new().with_locals(Expected::object([
                ("count", Expected::value(30)),
                ("dt", Expected::object([("Year", Expected::value(2020))])),
                ("arr", Expected::array([Expected::value(10), Expected::value(20)])),
            ]));
            ctx.evaluate_and_check(SLEEP_TEST, &check).await.map(|_| ())
        })
        .await
        .unwrap_err();

    match err {
        HarnessError::Mismatch {
            label,
            expected,
            actual,
            ..
        } => {
            assert_eq!(label, "locals#count");
            assert_eq!(expected, "30");
            assert_eq!(actual, "31");
        }
        other => panic!("expected mismatch, got {:?}", other),
    }
    assert_eq!(server.received("Runtime.getProperties").len(), 1);
}

#[tokio::test]
async fn wrong_pause_location_fails() {
    let server = endpoint().await;
    server.notify_after("Runtime.evaluate", "Debugger.paused", paused_at("SleepTest", 15, 8));

    let inspector = Inspector::new();
    let scripts = ScriptTable::subscribe(&inspector);
    let err = inspector
        .ready_with(&config(&server), scripts, |ctx| async move {
            let check = PauseCheck::new().at(SOURCE, 14, 8);
            ctx.evaluate_and_check(SLEEP_TEST, &check).await.map(|_| ())
        })
        .await
        .unwrap_err();

    assert!(err.is_assertion_failure());
    assert!(err.to_string().contains(&format!("{}#15#8", SOURCE)));
}

#[tokio::test]
async fn step_checks_only_the_last_pause() {
    let server = endpoint().await;
    server.notify_after("Debugger.stepOver", "Debugger.paused", paused_at("SleepTest", 15, 2));
    server.notify_after("Debugger.stepOver", "Debugger.paused", paused_at("SleepTest", 16, 2));
    serve_locals(&server, 30);

    let inspector = Inspector::new();
    let scripts = ScriptTable::subscribe(&inspector);
    inspector
        .ready_with(&config(&server), scripts, |ctx| async move {
            let check = PauseCheck::new()
                .at(SOURCE, 16, 2)
                .with_locals_fn(|locals| {
                    check_number(locals, "count", 30)?;
                    check_value_type(locals, "dt", "System.DateTime").map(|_| ())
                });
            ctx.step_and_check(StepKind::Over, &check, 2).await?;

            // locals of the last frame can still be inspected
            let locals = ctx.get_properties("dotnet:scope:0").await?;
            let members = ctx.check_object_on_locals(&locals, "dt").await?;
            check_number(&members, "Year", 2020)?;
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(server.received("Debugger.stepOver").len(), 2);
}

#[tokio::test]
async fn failed_command_is_a_protocol_error() {
    let server = endpoint().await;
    server.respond("Debugger.stepInto", |_| Err(json!({"message": "not paused"})));

    let inspector = Inspector::new();
    let scripts = ScriptTable::subscribe(&inspector);
    inspector
        .ready_with(&config(&server), scripts, |ctx| async move {
            let err = ctx
                .step_and_check(StepKind::Into, &PauseCheck::new(), 1)
                .await
                .unwrap_err();
            assert!(matches!(err, HarnessError::Protocol { .. }));
            // the pause wait armed for the step was released
            assert!(ctx.inspector().pending().is_empty());
            Ok(())
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn remote_exception_rejects_the_pause_wait() {
    let server = endpoint().await;
    server.notify_batch_after(
        "Runtime.evaluate",
        vec![Notification::new(
            "Runtime.exceptionThrown",
            json!({"timestamp": 1.0, "exceptionDetails": {"text": "Uncaught ReferenceError: sleep_test"}}),
        )],
    );

    let inspector = Inspector::new();
    let scripts = ScriptTable::subscribe(&inspector);
    inspector
        .ready_with(&config(&server), scripts, |ctx| async move {
            let err = ctx
                .evaluate_and_check(SLEEP_TEST, &PauseCheck::new())
                .await
                .unwrap_err();
            match err {
                HarnessError::RemoteException(payload) => {
                    assert_eq!(
                        payload["exceptionDetails"]["text"],
                        "Uncaught ReferenceError: sleep_test"
                    );
                }
                other => panic!("expected remote exception, got {:?}", other),
            }
            assert!(ctx.inspector().pending().is_empty());
            Ok(())
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn console_output_does_not_disturb_waits() {
    let server = endpoint().await;
    server.notify_batch_after(
        "Runtime.evaluate",
        vec![
            Notification::new(
                "Runtime.consoleAPICalled",
                json!({"type": "log", "args": [{"type": "string", "value": "sleeping"}]}),
            ),
            Notification::new("Debugger.paused", paused_at("SleepTest", 14, 8)),
        ],
    );

    let inspector = Inspector::new();
    let scripts = ScriptTable::subscribe(&inspector);
    inspector
        .ready_with(&config(&server), scripts, |ctx| async move {
            let check = PauseCheck::new().in_function("SleepTest");
            ctx.evaluate_and_check(SLEEP_TEST, &check).await.map(|_| ())
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn command_can_wait_for_another_event() {
    let server = endpoint().await;
    server.notify_after("Debugger.resume", "Debugger.resumed", json!({}));

    let inspector = Inspector::new();
    inspector.resolve_on("Debugger.resumed", "resumed");
    let scripts = ScriptTable::subscribe(&inspector);
    inspector
        .ready_with(&config(&server), scripts, |ctx| async move {
            let check = PauseCheck::new().waiting_for("resumed");
            assert_eq!(check.event(), "resumed");

            let resumed = ctx
                .send_command_and_check("Debugger.resume", None, &check)
                .await?;
            assert!(resumed.call_frames.is_empty());
            assert!(!ctx.inspector().is_waiting(cdp_harness::PAUSE));
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(server.received("Debugger.resume").len(), 1);
}
