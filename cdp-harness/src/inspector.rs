// Protocol event multiplexer
//
// Turns the notification stream into "await the next pause" checkpoints for straight-line
// test code, while standing handlers (script parsing, console output) see every message.

use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::scripts::ScriptTable;
use crate::session::SessionContext;
use cdp_client::commands::notifications;
use cdp_client::{
    debugger, profiler, runtime, CdpConnection, CdpError, Command, Event, Notification,
    NotificationStream,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Waiter name resolved by `Debugger.paused`
pub const PAUSE: &str = "pause";
/// Waiter name resolved by the runtime-ready notification
pub const READY: &str = "ready";
/// Notification the .NET debugger proxy sends once the runtime can be debugged
pub const DEFAULT_READY_METHOD: &str = "Mono.runtimeReady";

/// Callback invoked for every notification of one method
pub type Handler = Arc<dyn Fn(&Notification) -> HarnessResult<()> + Send + Sync>;

struct PendingWait {
    id: u64,
    tx: oneshot::Sender<HarnessResult<Value>>,
}

struct Inner {
    waiters: Mutex<HashMap<String, PendingWait>>,
    handlers: Mutex<HashMap<String, Handler>>,
    // notification method -> waiter name
    lifecycle: Mutex<HashMap<String, String>>,
    next_wait_id: AtomicU64,
}

#[derive(Clone)]
pub struct Inspector {
    inner: Arc<Inner>,
}

impl Default for Inspector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Inspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inspector")
            .field("waiting", &self.pending())
            .field("handlers", &self.inner.handlers.lock().len())
            .finish()
    }
}

impl Inspector {
    pub fn new() -> Self {
        let mut lifecycle = HashMap::new();
        lifecycle.insert(notifications::PAUSED.to_string(), PAUSE.to_string());
        lifecycle.insert(DEFAULT_READY_METHOD.to_string(), READY.to_string());

        Self {
            inner: Arc::new(Inner {
                waiters: Mutex::new(HashMap::new()),
                handlers: Mutex::new(HashMap::new()),
                lifecycle: Mutex::new(lifecycle),
                next_wait_id: AtomicU64::new(1),
            }),
        }
    }

    /// Use `method` instead of the default runtime-ready notification
    pub fn set_ready_method(&self, method: &str) {
        let mut lifecycle = self.inner.lifecycle.lock();
        lifecycle.retain(|_, name| name.as_str() != READY);
        lifecycle.insert(method.to_string(), READY.to_string());
    }

    /// Make `method` a lifecycle notification resolving the waiter called `name`.
    ///
    /// Like pauses, it then fails dispatch when it arrives with nobody waiting.
    pub fn resolve_on(&self, method: &str, name: &str) {
        self.inner
            .lifecycle
            .lock()
            .insert(method.to_string(), name.to_string());
    }

    /// Arm a one-shot wait for the next `name` event.
    ///
    /// Fails immediately if a wait for `name` is already outstanding.
    pub fn wait_for(&self, name: &str) -> HarnessResult<Waiter> {
        let mut waiters = self.inner.waiters.lock();
        if waiters.contains_key(name) {
            return Err(HarnessError::invalid_state(format!(
                "waiting for {} while another wait is already set up",
                name
            )));
        }

        let id = self.inner.next_wait_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        waiters.insert(name.to_string(), PendingWait { id, tx });
        debug!("Waiting for {} (wait id={})", name, id);

        Ok(Waiter {
            name: name.to_string(),
            id,
            rx,
            inner: Arc::downgrade(&self.inner),
        })
    }

    /// Register the handler for `method`, replacing any previous one
    pub fn on<F>(&self, method: &str, handler: F)
    where
        F: Fn(&Notification) -> HarnessResult<()> + Send + Sync + 'static,
    {
        let previous = self
            .inner
            .handlers
            .lock()
            .insert(method.to_string(), Arc::new(handler));
        if previous.is_some() {
            debug!("Replaced handler for {}", method);
        }
    }

    pub fn is_waiting(&self, name: &str) -> bool {
        self.inner.waiters.lock().contains_key(name)
    }

    /// Names of all outstanding waits
    pub fn pending(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.waiters.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Entry point for every inbound notification, in arrival order
    pub fn dispatch(&self, notification: &Notification) -> HarnessResult<()> {
        let method = notification.method.as_str();

        let lifecycle = self.inner.lifecycle.lock().get(method).cloned();
        if let Some(name) = lifecycle {
            self.notify_of(&name, notification.params.clone())?;
        }

        if method == notifications::CONSOLE_API_CALLED {
            match notification.parse() {
                Ok(Event::ConsoleApiCalled(console)) => {
                    info!("CWL: {}", console.first_arg_text().unwrap_or_default());
                }
                Ok(_) => {}
                Err(e) => warn!("Unreadable console notification: {}", e),
            }
        }

        // Clone out of the lock so a handler may register other handlers
        let handler = self.inner.handlers.lock().get(method).cloned();
        if let Some(handler) = handler {
            handler(notification)?;
        }

        if method == notifications::EXCEPTION_THROWN {
            let params = notification.params.clone();
            let rejected = self.reject_all(|| HarnessError::RemoteException(params.clone()));
            warn!("Remote exception, rejected {} waiter(s): {}", rejected, params);
        }

        Ok(())
    }

    fn notify_of(&self, name: &str, args: Value) -> HarnessResult<()> {
        let pending = self.inner.waiters.lock().remove(name).ok_or_else(|| {
            HarnessError::invalid_state(format!("notifying of {}, but nobody waiting", name))
        })?;

        debug!("Resolving {} (wait id={})", name, pending.id);
        if pending.tx.send(Ok(args)).is_err() {
            debug!("Waiter for {} went away before resolution", name);
        }
        Ok(())
    }

    /// Reject every outstanding waiter and clear the table; returns how many were rejected
    pub fn reject_all<F>(&self, make_error: F) -> usize
    where
        F: Fn() -> HarnessError,
    {
        let drained: Vec<(String, PendingWait)> = self.inner.waiters.lock().drain().collect();
        let count = drained.len();
        for (name, pending) in drained {
            debug!("Rejecting waiter for {}", name);
            pending.tx.send(Err(make_error())).ok();
        }
        count
    }

    /// Open a session, run setup until the runtime is ready, then close it
    pub async fn ready(&self, config: &HarnessConfig, scripts: ScriptTable) -> HarnessResult<()> {
        self.ready_with(config, scripts, |_ctx| async { Ok(()) }).await
    }

    /// Open a session, run setup until the runtime is ready, hand the session to `body`,
    /// then close the channel whatever the outcome.
    ///
    /// `config.timeout` bounds the whole sequence, connection included.
    pub async fn ready_with<F, Fut>(
        &self,
        config: &HarnessConfig,
        scripts: ScriptTable,
        body: F,
    ) -> HarnessResult<()>
    where
        F: FnOnce(SessionContext) -> Fut,
        Fut: Future<Output = HarnessResult<()>>,
    {
        let deadline = Instant::now() + config.timeout;
        let timed_out = || {
            HarnessError::Timeout(format!(
                "session did not complete within {:?}",
                config.timeout
            ))
        };

        self.set_ready_method(&config.ready_event);

        // Armed before connecting: an early notification cannot be missed, and a conflicting
        // wait fails before there is a channel to close
        let ready = self.wait_for(READY)?;

        let (connection, mut notifications) = tokio::time::timeout_at(
            deadline,
            CdpConnection::connect_with_config(&config.endpoint, config.connection.clone()),
        )
        .await
        .map_err(|_| timed_out())??;
        let connection = Arc::new(connection);

        let token = CancellationToken::new();
        let ctx = SessionContext::new(connection.clone(), self.clone(), token.clone(), scripts);

        let session = async move {
            tokio::try_join!(
                setup_command(&ctx, profiler::Enable::METHOD),
                setup_command(&ctx, runtime::Enable::METHOD),
                setup_command(&ctx, debugger::Enable::METHOD),
                setup_command(&ctx, runtime::RunIfWaitingForDebugger::METHOD),
            )?;

            info!("Waiting for the runtime to be ready");
            ctx.wait(ready).await?;
            info!("Runtime ready");

            body(ctx).await
        };

        let outcome = tokio::select! {
            res = session => res,
            res = self.pump(&mut notifications) => res,
            _ = tokio::time::sleep_until(deadline) => {
                token.cancel();
                self.reject_all(timed_out);
                Err(timed_out())
            }
        };

        // Waiters do not outlive the channel
        self.reject_all(|| HarnessError::Transport(CdpError::ConnectionClosed));

        if let Err(e) = connection.close().await {
            warn!("Failed to close session channel: {}", e);
        }

        match &outcome {
            Ok(()) => info!("Session finished"),
            Err(e) => error!("Session failed: {}", e),
        }
        outcome
    }

    // Dispatch loop; only returns on a dispatch failure or when the channel ends
    async fn pump(&self, notifications: &mut NotificationStream) -> HarnessResult<()> {
        while let Some(notification) = notifications.recv().await {
            if let Err(e) = self.dispatch(&notification) {
                error!("Dispatch of {} failed: {}", notification.method, e);
                return Err(e);
            }
        }
        Err(HarnessError::Transport(CdpError::ConnectionClosed))
    }
}

async fn setup_command(ctx: &SessionContext, method: &str) -> HarnessResult<()> {
    let reply = ctx.send_command(method, None).await?;
    if let Some(error) = reply.error() {
        warn!("Setup command {} failed: {}", method, error);
    }
    Ok(())
}

/// Pending completion for the next occurrence of a named event.
///
/// Dropping it before resolution removes its entry, so the name can be waited on again.
pub struct Waiter {
    name: String,
    id: u64,
    rx: oneshot::Receiver<HarnessResult<Value>>,
    inner: Weak<Inner>,
}

impl Waiter {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Waiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waiter")
            .field("name", &self.name)
            .field("id", &self.id)
            .finish()
    }
}

impl Future for Waiter {
    type Output = HarnessResult<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| {
                res.unwrap_or_else(|_| Err(HarnessError::Transport(CdpError::ConnectionClosed)))
            })
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let mut waiters = inner.waiters.lock();
        if waiters.get(&self.name).is_some_and(|pending| pending.id == self.id) {
            debug!("Dropping unresolved waiter for {}", self.name);
            waiters.remove(&self.name);
        }
    }
}
