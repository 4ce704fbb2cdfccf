//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod genai;
mod message_sink;
mod tts_engine;
mod voice_gateway;

pub use genai::{
    ContentPart, GenAiError, GenAiPort, GenerationChunk, GenerationConfig, GenerationRequest,
    GenerationStream, HarmCategory, HarmThreshold, InlinePayload, Modality, SafetySetting,
};
pub use message_sink::{FileAttachment, MessageSinkPort, SinkError};
pub use tts_engine::{AudioStream, SynthesisRequest, TtsEnginePort, TtsError};
pub use voice_gateway::{GatewayError, PlaybackCompletion, VoiceGatewayPort};
