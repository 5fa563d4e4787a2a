// Session context
//
// What a running test body holds: the command channel, the inspector, the script table
// and the session's cancellation token.

use crate::channel::CommandSender;
use crate::error::{HarnessError, HarnessResult};
use crate::inspector::{Inspector, Waiter};
use crate::matcher::PropertySource;
use crate::scripts::ScriptTable;
use async_trait::async_trait;
use cdp_client::{Command, CommandReply, PropertyDescriptor};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Clone)]
pub struct SessionContext {
    sender: Arc<dyn CommandSender>,
    inspector: Inspector,
    token: CancellationToken,
    scripts: ScriptTable,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("inspector", &self.inspector)
            .field("cancelled", &self.token.is_cancelled())
            .field("scripts", &self.scripts.len())
            .finish()
    }
}

impl SessionContext {
    pub fn new(
        sender: Arc<dyn CommandSender>,
        inspector: Inspector,
        token: CancellationToken,
        scripts: ScriptTable,
    ) -> Self {
        Self {
            sender,
            inspector,
            token,
            scripts,
        }
    }

    pub fn inspector(&self) -> &Inspector {
        &self.inspector
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn scripts(&self) -> &ScriptTable {
        &self.scripts
    }

    fn cancelled(&self, what: &str) -> HarnessError {
        HarnessError::Timeout(format!("session cancelled while {}", what))
    }

    /// Send a raw command; a protocol-level failure comes back as `CommandReply::Failure`
    pub async fn send_command(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> HarnessResult<CommandReply> {
        let shown = params.as_ref().unwrap_or(&Value::Null);
        debug!("-> {} {}", method, shown);
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(self.cancelled(method)),
            reply = self.sender.send_command(method, params) => Ok(reply?),
        }
    }

    /// Send a typed command; a failed reply is an error carrying the request
    pub async fn send<C: Command + Sync>(&self, command: &C) -> HarnessResult<C::Returns> {
        let request = serde_json::to_value(command)?;
        let reply = self.send_command(C::METHOD, Some(request.clone())).await?;
        match reply {
            CommandReply::Success(value) => Ok(serde_json::from_value(value)?),
            CommandReply::Failure(error) => Err(HarnessError::Protocol {
                method: C::METHOD.to_string(),
                request,
                error,
            }),
        }
    }

    /// Arm a wait on the session's inspector
    pub fn wait_for(&self, name: &str) -> HarnessResult<Waiter> {
        self.inspector.wait_for(name)
    }

    /// Await an armed waiter, giving up if the session is cancelled
    pub async fn wait(&self, waiter: Waiter) -> HarnessResult<Value> {
        let name = waiter.name().to_string();
        tokio::select! {
            res = waiter => res,
            _ = self.token.cancelled() => Err(self.cancelled(&format!("waiting for {}", name))),
        }
    }
}

#[async_trait]
impl PropertySource for SessionContext {
    async fn get_properties(&self, object_id: &str) -> HarnessResult<Vec<PropertyDescriptor>> {
        SessionContext::get_properties(self, object_id).await
    }
}
