// CDP Event Loop
//
// Owns the WebSocket: writes commands, routes replies, forwards notifications in order

use crate::events::Notification;
use crate::protocol::{CdpError, CdpMessage, CdpRequest, CdpResult, CommandReply};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, trace, warn};

/// Request to send a command and get reply
pub struct CommandRequest {
    pub request: CdpRequest,
    pub reply_tx: oneshot::Sender<CdpResult<CommandReply>>,
}

enum Outbound {
    Command(CommandRequest),
    Close(oneshot::Sender<()>),
}

/// Handle to the event loop for sending commands
#[derive(Clone, Debug)]
pub struct EventLoopHandle {
    outbound_tx: mpsc::Sender<Outbound>,
}

impl std::fmt::Debug for Outbound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Command(cmd) => write!(f, "Command({})", cmd.request.method),
            Self::Close(_) => write!(f, "Close"),
        }
    }
}

impl EventLoopHandle {
    /// Send a command and wait for reply
    pub async fn send_command(&self, request: CdpRequest) -> CdpResult<CommandReply> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.outbound_tx
            .send(Outbound::Command(CommandRequest { request, reply_tx }))
            .await
            .map_err(|_| CdpError::ConnectionClosed)?;

        reply_rx.await.map_err(|_| CdpError::ConnectionClosed)?
    }

    /// Send a close frame and wait for the loop to stop
    pub async fn close(&self) -> CdpResult<()> {
        let (done_tx, done_rx) = oneshot::channel();
        if self.outbound_tx.send(Outbound::Close(done_tx)).await.is_err() {
            // Loop already gone
            return Ok(());
        }
        done_rx.await.map_err(|_| CdpError::ConnectionClosed)
    }
}

/// Start the event loop task.
///
/// Notifications are forwarded on an unbounded queue: dropping one would break the
/// exactly-once, in-order delivery the consumer relies on.
pub fn spawn_event_loop<S>(
    stream: WebSocketStream<S>,
) -> (EventLoopHandle, mpsc::UnboundedReceiver<Notification>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (outbound_tx, outbound_rx) = mpsc::channel(32);
    let (notification_tx, notification_rx) = mpsc::unbounded_channel();

    tokio::spawn(event_loop_task(stream, outbound_rx, notification_tx));

    (EventLoopHandle { outbound_tx }, notification_rx)
}

/// Main event loop task
async fn event_loop_task<S>(
    stream: WebSocketStream<S>,
    mut outbound_rx: mpsc::Receiver<Outbound>,
    notification_tx: mpsc::UnboundedSender<Notification>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    info!("Event loop started");

    let (mut writer, mut reader) = stream.split();
    let mut pending_replies = PendingReplies::new();
    let mut close_ack: Option<oneshot::Sender<()>> = None;

    loop {
        tokio::select! {
            // Handle outgoing commands
            Some(outbound) = outbound_rx.recv() => {
                match outbound {
                    Outbound::Command(cmd) => {
                        let id = cmd.request.id;
                        debug!("Sending command id={} method={}", id, cmd.request.method);

                        let encoded = match cmd.request.encode() {
                            Ok(encoded) => encoded,
                            Err(e) => {
                                cmd.reply_tx.send(Err(e)).ok();
                                continue;
                            }
                        };

                        if let Err(e) = writer.send(Message::Text(encoded)).await {
                            error!("Failed to write command: {}", e);
                            cmd.reply_tx.send(Err(CdpError::WebSocket(e.to_string()))).ok();
                            continue;
                        }

                        pending_replies.insert(id, cmd.reply_tx);
                    }
                    Outbound::Close(done_tx) => {
                        debug!("Closing WebSocket");
                        if let Err(e) = writer.send(Message::Close(None)).await {
                            warn!("Failed to send close frame: {}", e);
                        }
                        close_ack = Some(done_tx);
                        break;
                    }
                }
            }

            // Handle incoming frames
            frame = reader.next() => {
                prune_abandoned(&mut pending_replies);
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        trace!(msg = %text, "Received frame");
                        match CdpMessage::decode(&text) {
                            Ok(CdpMessage::Reply { id, reply }) => {
                                debug!("Received reply id={}", id);
                                if let Some(tx) = pending_replies.remove(&id) {
                                    tx.send(Ok(reply)).ok();
                                } else {
                                    warn!("Received reply for unknown command id={}", id);
                                }
                            }
                            Ok(CdpMessage::Notification { method, params }) => {
                                debug!("Received notification {}", method);
                                if notification_tx.send(Notification { method, params }).is_err() {
                                    warn!("Notification receiver dropped, future notifications will be discarded");
                                }
                            }
                            Err(e) => {
                                warn!("Failed to decode frame: {}", e);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("WebSocket closed by remote");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Ping/pong are answered by tungstenite; binary frames are not part of CDP
                    }
                    Some(Err(e)) => {
                        error!("Failed to read frame: {}", e);
                        break;
                    }
                    None => {
                        info!("WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }

    for (_, tx) in pending_replies.drain() {
        tx.send(Err(CdpError::ConnectionClosed)).ok();
    }

    if let Some(done_tx) = close_ack {
        done_tx.send(()).ok();
    }

    info!("Event loop shutting down");
}

type PendingReplies = HashMap<u64, oneshot::Sender<CdpResult<CommandReply>>>;

// Callers that timed out have dropped their receiver; their slot can never be answered
fn prune_abandoned(pending: &mut PendingReplies) -> usize {
    let before = pending.len();
    pending.retain(|_, tx| !tx.is_closed());
    let pruned = before - pending.len();
    if pruned > 0 {
        debug!("Dropped {} abandoned reply slot(s)", pruned);
    }
    pruned
}
