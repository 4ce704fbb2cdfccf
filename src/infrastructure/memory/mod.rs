//! Memory Layer - In-Memory Adapters
//!
//! 语音网关与消息出口的内存实现，用于本地运行与测试

mod message_sink;
mod voice_gateway;

pub use message_sink::{RecordingMessageSink, SentMessage};
pub use voice_gateway::{GatewayEvent, InMemoryVoiceGateway, PlaybackMode};
