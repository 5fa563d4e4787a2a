// Loopback CDP endpoint for tests
//
// Speaks real WebSocket frames so the whole client stack is exercised

use crate::events::Notification;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Computes the reply for a command from its params: `Ok` becomes `result`, `Err` becomes `error`
pub type Responder = Arc<dyn Fn(&Value) -> Result<Value, Value> + Send + Sync>;

/// A tiny CDP endpoint used for unit/integration testing.
///
/// Every command gets a reply (`{}` unless a responder is registered for its method).
/// Notifications can be queued for delivery on connect, after the next occurrence
/// of a given command, or pushed at any time to the live connection.
pub struct MockCdpServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<State>,
}

#[derive(Default)]
struct State {
    responders: Mutex<HashMap<String, Responder>>,
    received: Mutex<Vec<(String, Value)>>,
    on_connect: Mutex<Vec<Notification>>,
    after: Mutex<HashMap<String, VecDeque<Vec<Notification>>>>,
    live: Mutex<Option<mpsc::UnboundedSender<Notification>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockCdpServer {
    pub async fn spawn() -> std::io::Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0))).await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let state = Arc::new(State::default());

        tokio::spawn(run(listener, state.clone(), shutdown.clone()));

        Ok(Self {
            addr,
            shutdown,
            state,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("ws://{}/launch-chrome-and-connect", self.addr)
    }

    /// Register the reply for every future `method` command
    pub fn respond<F>(&self, method: &str, responder: F)
    where
        F: Fn(&Value) -> Result<Value, Value> + Send + Sync + 'static,
    {
        lock(&self.state.responders).insert(method.to_string(), Arc::new(responder));
    }

    /// Queue a notification sent right after the WebSocket handshake
    pub fn notify_on_connect(&self, method: &str, params: Value) {
        lock(&self.state.on_connect).push(Notification::new(method, params));
    }

    /// Queue a notification sent after the reply to the next `command` not yet claimed
    pub fn notify_after(&self, command: &str, method: &str, params: Value) {
        self.notify_batch_after(command, vec![Notification::new(method, params)]);
    }

    /// Like `notify_after`, with several notifications for the same command occurrence
    pub fn notify_batch_after(&self, command: &str, batch: Vec<Notification>) {
        lock(&self.state.after)
            .entry(command.to_string())
            .or_default()
            .push_back(batch);
    }

    /// Push a notification to the live connection; returns false if nobody is connected
    pub fn push(&self, method: &str, params: Value) -> bool {
        match lock(&self.state.live).as_ref() {
            Some(tx) => tx.send(Notification::new(method, params)).is_ok(),
            None => false,
        }
    }

    /// Params of every received `method` command, in arrival order
    pub fn received(&self, method: &str) -> Vec<Value> {
        lock(&self.state.received)
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    /// Method names of every received command, in arrival order
    pub fn received_methods(&self) -> Vec<String> {
        lock(&self.state.received)
            .iter()
            .map(|(m, _)| m.clone())
            .collect()
    }
}

impl Drop for MockCdpServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run(listener: TcpListener, state: Arc<State>, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("Mock endpoint accepted {}", peer);
                    tokio::spawn(serve(stream, state.clone(), shutdown.clone()));
                }
                Err(e) => {
                    warn!("Mock endpoint accept failed: {}", e);
                    break;
                }
            }
        }
    }
}

async fn serve(stream: TcpStream, state: Arc<State>, shutdown: CancellationToken) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("Mock endpoint handshake failed: {}", e);
            return;
        }
    };
    let (mut writer, mut reader) = ws.split();

    let (live_tx, mut live_rx) = mpsc::unbounded_channel();
    *lock(&state.live) = Some(live_tx);

    let initial: Vec<Notification> = lock(&state.on_connect).clone();
    for notification in initial {
        if writer.send(encode_notification(&notification)).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            Some(notification) = live_rx.recv() => {
                if writer.send(encode_notification(&notification)).await.is_err() {
                    break;
                }
            }
            frame = reader.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => continue,
                };

                let command: Value = match serde_json::from_str(&text) {
                    Ok(command) => command,
                    Err(e) => {
                        warn!("Mock endpoint got invalid JSON: {}", e);
                        continue;
                    }
                };
                let id = command["id"].clone();
                let method = command["method"].as_str().unwrap_or_default().to_string();
                let params = command.get("params").cloned().unwrap_or(Value::Null);

                lock(&state.received).push((method.clone(), params.clone()));

                let responder = lock(&state.responders).get(&method).cloned();
                let reply = match responder.map(|r| r(&params)).unwrap_or_else(|| Ok(json!({}))) {
                    Ok(result) => json!({"id": id, "result": result}),
                    Err(error) => json!({"id": id, "error": error}),
                };
                if writer.send(Message::Text(reply.to_string())).await.is_err() {
                    break;
                }

                let batch = lock(&state.after)
                    .get_mut(&method)
                    .and_then(VecDeque::pop_front)
                    .unwrap_or_default();
                for notification in batch {
                    if writer.send(encode_notification(&notification)).await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    *lock(&state.live) = None;
}

fn encode_notification(notification: &Notification) -> Message {
    Message::Text(json!({"method": notification.method, "params": notification.params}).to_string())
}
