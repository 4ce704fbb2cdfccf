//! Voice Gateway Port - 聊天平台语音连接抽象
//!
//! 连接 / 切换 / 断开语音频道，以及向频道音频输出端推送字节流

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{GuildId, VoiceChannel};

/// 语音网关错误
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("No active connection for guild {0}")]
    NoConnection(GuildId),

    #[error("Playback failed: {0}")]
    PlaybackFailed(String),
}

/// 播放完成信号
///
/// 音频输出端在播放结束时发送一次；发送端被丢弃（例如断开连接）同样视为结束
pub type PlaybackCompletion = oneshot::Receiver<()>;

/// Voice Gateway Port
#[async_trait]
pub trait VoiceGatewayPort: Send + Sync {
    /// 建立新的语音连接
    async fn connect(&self, guild: GuildId, channel: &VoiceChannel) -> Result<(), GatewayError>;

    /// 将现有连接切换到另一个频道
    async fn move_to(&self, guild: GuildId, channel: &VoiceChannel) -> Result<(), GatewayError>;

    /// 断开连接
    async fn disconnect(&self, guild: GuildId) -> Result<(), GatewayError>;

    /// 开始播放编码音频，返回完成信号
    async fn play(&self, guild: GuildId, audio: Bytes) -> Result<PlaybackCompletion, GatewayError>;
}
