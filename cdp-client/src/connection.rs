// CDP connection management
//
// Handles the WebSocket handshake, event loop startup and request ids

use crate::eventloop::{spawn_event_loop, EventLoopHandle};
use crate::events::Notification;
use crate::protocol::*;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tracing::{debug, info};

/// In-order stream of notifications for one connection
pub type NotificationStream = mpsc::UnboundedReceiver<Notification>;

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub connect_timeout: Duration,
    pub reply_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            reply_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
pub struct CdpConnection {
    event_loop: EventLoopHandle,
    next_id: AtomicU64,
    config: ConnectionConfig,
}

impl CdpConnection {
    /// Connect to a CDP WebSocket endpoint
    pub async fn connect(url: &str) -> CdpResult<(Self, NotificationStream)> {
        Self::connect_with_config(url, ConnectionConfig::default()).await
    }

    pub async fn connect_with_config(
        url: &str,
        config: ConnectionConfig,
    ) -> CdpResult<(Self, NotificationStream)> {
        info!("Connecting to CDP endpoint at {}", url);

        let (stream, _response) = timeout(config.connect_timeout, connect_async(url))
            .await
            .map_err(|_| CdpError::Timeout(format!("connection to {}", url)))?
            .map_err(|e| CdpError::ConnectionFailed(e.to_string()))?;

        let (event_loop, notifications) = spawn_event_loop(stream);

        info!("Connected to CDP endpoint");

        Ok((
            Self {
                event_loop,
                next_id: AtomicU64::new(1),
                config,
            },
            notifications,
        ))
    }

    /// Send a command and wait for reply.
    ///
    /// A protocol-level failure comes back as `Ok(CommandReply::Failure(..))`;
    /// `Err` is reserved for transport problems.
    pub async fn send_command(&self, method: &str, params: Option<Value>) -> CdpResult<CommandReply> {
        let request = CdpRequest::new(self.next_id(), method, params);
        debug!("Sending command id={} method={}", request.id, method);

        timeout(self.config.reply_timeout, self.event_loop.send_command(request))
            .await
            .map_err(|_| CdpError::Timeout(format!("reply to {}", method)))?
    }

    /// Close the WebSocket
    pub async fn close(&self) -> CdpResult<()> {
        debug!("Closing CDP connection");
        self.event_loop.close().await
    }

    /// Generate next request ID
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}
