// Command channel seam
//
// The session only needs "send a command, get its reply"; tests substitute their own sender

use async_trait::async_trait;
use cdp_client::{CdpConnection, CdpResult, CommandReply};
use serde_json::Value;

#[async_trait]
pub trait CommandSender: Send + Sync {
    async fn send_command(&self, method: &str, params: Option<Value>) -> CdpResult<CommandReply>;
}

#[async_trait]
impl CommandSender for CdpConnection {
    async fn send_command(&self, method: &str, params: Option<Value>) -> CdpResult<CommandReply> {
        CdpConnection::send_command(self, method, params).await
    }
}
