//! Message Sink Port - 向触发消息所在频道回复

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Send failed: {0}")]
    SendFailed(String),
}

/// 可下载附件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub filename: String,
    pub description: Option<String>,
    pub data: Bytes,
}

/// Message Sink Port
#[async_trait]
pub trait MessageSinkPort: Send + Sync {
    /// 作为对触发消息的回复发送
    async fn reply(&self, content: &str) -> Result<(), SinkError>;

    /// 作为普通消息发送到同一频道
    async fn send(&self, content: &str) -> Result<(), SinkError>;

    /// 发送带附件的消息
    async fn send_file(&self, content: &str, file: FileAttachment) -> Result<(), SinkError>;
}
