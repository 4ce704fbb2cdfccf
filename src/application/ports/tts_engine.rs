//! TTS Engine Port - 语音合成提供方抽象
//!
//! 定义音色列表与流式合成的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use thiserror::Error;

use crate::domain::VoiceEntry;

/// TTS 错误
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// 合成请求
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// 要合成的文本内容
    pub text: String,
    /// 提供方音色 ID
    pub voice_id: String,
    /// 模型 ID（固定的多语言模型）
    pub model_id: String,
    /// 输出编码（固定码率/采样率的 MP3）
    pub output_format: String,
}

/// 合成音频字节流
pub type AudioStream = BoxStream<'static, Result<Bytes, TtsError>>;

/// TTS Engine Port
#[async_trait]
pub trait TtsEnginePort: Send + Sync {
    /// 列出提供方全部音色 (name, id)
    async fn list_voices(&self) -> Result<Vec<VoiceEntry>, TtsError>;

    /// 流式合成，返回编码后的音频字节流
    async fn synthesize_stream(&self, request: SynthesisRequest) -> Result<AudioStream, TtsError>;

    /// 检查 TTS 服务是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}
