//! In-Memory Message Sink - 按顺序记录发出的消息

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::application::ports::{FileAttachment, MessageSinkPort, SinkError};

/// 已发送的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    Reply(String),
    Send(String),
    File { content: String, file: FileAttachment },
}

#[derive(Default)]
pub struct RecordingMessageSink {
    sent: Mutex<Vec<SentMessage>>,
}

impl RecordingMessageSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl MessageSinkPort for RecordingMessageSink {
    async fn reply(&self, content: &str) -> Result<(), SinkError> {
        self.sent.lock().push(SentMessage::Reply(content.to_string()));
        Ok(())
    }

    async fn send(&self, content: &str) -> Result<(), SinkError> {
        self.sent.lock().push(SentMessage::Send(content.to_string()));
        Ok(())
    }

    async fn send_file(&self, content: &str, file: FileAttachment) -> Result<(), SinkError> {
        self.sent.lock().push(SentMessage::File {
            content: content.to_string(),
            file,
        });
        Ok(())
    }
}
