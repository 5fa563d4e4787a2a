// Test-facing debugger operations
//
// Breakpoints, evaluate/step with pause verification, and locals inspection,
// all driven through a running session.

use crate::error::{HarnessError, HarnessResult};
use crate::expected::Expected;
use crate::inspector::PAUSE;
use crate::location::{check_location, ExpectedLocation};
use crate::matcher::Matcher;
use crate::session::SessionContext;
use cdp_client::debugger::{SetBreakpointByUrl, StepKind};
use cdp_client::runtime::{Evaluate, GetProperties};
use cdp_client::{CallFrame, Command, CommandReply, Paused, PropertyDescriptor};
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, warn};

type LocalsFn = Box<dyn Fn(&[PropertyDescriptor]) -> HarnessResult<()> + Send + Sync>;
type PauseFn = Box<dyn Fn(&Paused) -> HarnessResult<()> + Send + Sync>;

/// How the locals of a paused frame are verified
pub enum LocalsCheck {
    Shape(Expected),
    Predicate(LocalsFn),
}

impl fmt::Debug for LocalsCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shape(expected) => f.debug_tuple("Shape").field(expected).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// What the pause following a command must look like.
///
/// Every part is optional; an empty check only waits for the pause.
#[derive(Default)]
pub struct PauseCheck {
    event: Option<String>,
    location: Option<ExpectedLocation>,
    function_name: Option<String>,
    on_pause: Option<PauseFn>,
    locals: Option<LocalsCheck>,
}

impl fmt::Debug for PauseCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PauseCheck")
            .field("event", &self.event)
            .field("location", &self.location)
            .field("function_name", &self.function_name)
            .field("on_pause", &self.on_pause.is_some())
            .field("locals", &self.locals)
            .finish()
    }
}

impl PauseCheck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for `name` instead of [`PAUSE`]; the event's payload is checked as a pause
    pub fn waiting_for(mut self, name: impl Into<String>) -> Self {
        self.event = Some(name.into());
        self
    }

    pub fn event(&self) -> &str {
        self.event.as_deref().unwrap_or(PAUSE)
    }

    /// Top frame must be at `url#line#column`
    pub fn at(mut self, url: impl Into<String>, line: i64, column: i64) -> Self {
        self.location = Some(ExpectedLocation::new(url, line, column));
        self
    }

    pub fn in_function(mut self, name: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self
    }

    /// Extra verification over the whole `Debugger.paused` payload
    pub fn on_pause<F>(mut self, check: F) -> Self
    where
        F: Fn(&Paused) -> HarnessResult<()> + Send + Sync + 'static,
    {
        self.on_pause = Some(Box::new(check));
        self
    }

    pub fn with_locals(mut self, expected: impl Into<Expected>) -> Self {
        self.locals = Some(LocalsCheck::Shape(expected.into()));
        self
    }

    pub fn with_locals_fn<F>(mut self, check: F) -> Self
    where
        F: Fn(&[PropertyDescriptor]) -> HarnessResult<()> + Send + Sync + 'static,
    {
        self.locals = Some(LocalsCheck::Predicate(Box::new(check)));
        self
    }
}

impl SessionContext {
    /// Set a breakpoint by logical source key.
    ///
    /// The key is resolved through the script table; the reply must succeed or fail as
    /// `expect_ok` says.
    pub async fn set_breakpoint(
        &self,
        url_key: &str,
        line: i64,
        column: i64,
        expect_ok: bool,
    ) -> HarnessResult<CommandReply> {
        let url = self.scripts().url_for_file(url_key).ok_or_else(|| {
            HarnessError::invalid_state(format!("no script announced for {}", url_key))
        })?;

        let request = serde_json::to_value(SetBreakpointByUrl {
            line_number: line,
            column_number: column,
            url,
        })?;
        let reply = self
            .send_command(SetBreakpointByUrl::METHOD, Some(request.clone()))
            .await?;

        if let (Some(error), true) = (reply.error(), expect_ok) {
            return Err(HarnessError::Protocol {
                method: SetBreakpointByUrl::METHOD.to_string(),
                request,
                error: error.clone(),
            });
        }
        if reply.is_ok() && !expect_ok {
            return Err(HarnessError::mismatch(
                format!("breakpoint {}#{}#{}", url_key, line, column),
                "breakpoint was expected to fail",
                "error reply",
                reply.value(),
            ));
        }

        info!("Breakpoint set at {}#{}#{} (ok={})", url_key, line, column, reply.is_ok());
        Ok(reply)
    }

    /// Send a command that must succeed and then pause, and verify the pause.
    ///
    /// The wait (for `check.event()`) is armed before the command goes out.
    pub async fn send_command_and_check(
        &self,
        method: &str,
        params: Option<Value>,
        check: &PauseCheck,
    ) -> HarnessResult<Paused> {
        let event = check.event();
        let waiter = self.wait_for(event)?;

        let reply = self.send_command(method, params.clone()).await?;
        if let CommandReply::Failure(error) = reply {
            warn!("{} failed: {}", method, error);
            return Err(HarnessError::Protocol {
                method: method.to_string(),
                request: params.unwrap_or(Value::Null),
                error,
            });
        }

        let payload = self.wait(waiter).await?;
        let paused: Paused =
            serde_json::from_value(payload).map_err(|e| HarnessError::malformed(event, e))?;
        debug!("Got {} ({}) after {}", event, paused.reason, method);

        self.verify_pause(&paused, check).await?;
        Ok(paused)
    }

    async fn verify_pause(&self, paused: &Paused, check: &PauseCheck) -> HarnessResult<()> {
        let top = || {
            paused
                .top_frame()
                .ok_or_else(|| HarnessError::malformed("Debugger.paused", "no call frames"))
        };

        if let Some(name) = &check.function_name {
            let frame = top()?;
            if &frame.function_name != name {
                return Err(HarnessError::mismatch(
                    "pause",
                    "function name didn't match",
                    name,
                    &frame.function_name,
                ));
            }
        }

        if let Some(location) = &check.location {
            check_location(location, &top()?.location, self.scripts())?;
        }

        if let Some(on_pause) = &check.on_pause {
            on_pause(paused)?;
        }

        if let Some(locals) = &check.locals {
            self.check_locals_on_frame(top()?, locals).await?;
        }
        Ok(())
    }

    pub async fn evaluate_and_check(
        &self,
        expression: &str,
        check: &PauseCheck,
    ) -> HarnessResult<Paused> {
        let params = serde_json::to_value(Evaluate::new(expression))?;
        self.send_command_and_check(Evaluate::METHOD, Some(params), check)
            .await
    }

    /// Step `times` times; only the last pause is checked
    pub async fn step_and_check(
        &self,
        kind: StepKind,
        check: &PauseCheck,
        times: usize,
    ) -> HarnessResult<Paused> {
        if times == 0 {
            return Err(HarnessError::invalid_state("stepping zero times"));
        }

        let unchecked = PauseCheck::new();
        for _ in 1..times {
            self.send_command_and_check(kind.method(), None, &unchecked)
                .await?;
        }
        self.send_command_and_check(kind.method(), None, check).await
    }

    /// Fetch a frame's locals and verify them
    pub async fn check_locals_on_frame(
        &self,
        frame: &CallFrame,
        check: &LocalsCheck,
    ) -> HarnessResult<Vec<PropertyDescriptor>> {
        let locals = self.get_properties(&frame.call_frame_id).await?;

        let outcome = match check {
            LocalsCheck::Shape(expected) => {
                Matcher::new(self)
                    .match_props(&locals, expected, "locals", None)
                    .await
            }
            LocalsCheck::Predicate(predicate) => predicate(locals.as_slice()),
        };

        if let Err(e) = outcome {
            warn!(
                "Locals check failed in {} for locals: {}",
                frame.function_name,
                serde_json::to_string(&locals).unwrap_or_default()
            );
            return Err(e);
        }
        Ok(locals)
    }

    /// Members of the local `name`, which must be an object reference
    pub async fn check_object_on_locals(
        &self,
        locals: &[PropertyDescriptor],
        name: &str,
    ) -> HarnessResult<Vec<PropertyDescriptor>> {
        let local = crate::checks::find_property(locals, name)?;
        let object_id = local
            .value
            .as_ref()
            .and_then(|v| v.object_id())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                HarnessError::mismatch(name, format!("no objectId found for {}", name), "objectId", "<missing>")
            })?;
        self.get_properties(object_id).await
    }

    /// `Runtime.getProperties` on an object or call frame id
    pub async fn get_properties(&self, object_id: &str) -> HarnessResult<Vec<PropertyDescriptor>> {
        Ok(self.send(&GetProperties::new(object_id)).await?.result)
    }
}
