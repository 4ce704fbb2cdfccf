//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（TtsEngine、GenAi、VoiceGateway、MessageSink）
//! - voice_catalog / voice_connections: 共享状态
//! - tts_pipeline / chat_pipeline / image_pipeline: 命令流水线
//! - context: 组装好的应用上下文
//! - error: 应用层错误定义

pub mod chat_pipeline;
pub mod context;
pub mod error;
pub mod image_pipeline;
pub mod ports;
pub mod tts_pipeline;
pub mod voice_catalog;
pub mod voice_connections;

// Re-exports
pub use chat_pipeline::{ChatPipeline, ChatPipelineConfig};
pub use context::AppContext;
pub use error::{ChatError, ImageError, TtsPipelineError, VoiceError};
pub use image_pipeline::{
    GeneratedImage, ImagePipeline, ImagePipelineConfig, ImageRequest, InputImage,
};
pub use tts_pipeline::{
    SpeakOutcome, SpeakRequest, SpokenAudio, TtsFile, TtsPipeline, TtsPipelineConfig,
};
pub use voice_catalog::VoiceCatalog;
pub use voice_connections::{JoinOutcome, PlaybackHandle, VoiceConnectionManager};

pub use ports::{
    // TTS engine
    AudioStream,
    SynthesisRequest,
    TtsEnginePort,
    TtsError,
    // Generative AI
    GenAiError,
    GenAiPort,
    GenerationChunk,
    GenerationRequest,
    // Voice gateway
    GatewayError,
    VoiceGatewayPort,
    // Message sink
    FileAttachment,
    MessageSinkPort,
    SinkError,
};
