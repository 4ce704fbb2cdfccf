//! Zerbania - 语音频道 TTS 与生成式 AI 聊天机器人
//!
//! 架构设计: DDD + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - catalog: 音色目录快照
//! - session: guild 语音会话
//! - message / media: 消息切分、附件校验
//!
//! 应用层 (application/):
//! - Ports: 端口定义（TtsEngine, GenAi, VoiceGateway, MessageSink）
//! - VoiceCatalog / VoiceConnectionManager: 共享状态
//! - Pipelines: TTS、对话、图像生成
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: ElevenLabs Client, Gemini Client (SSE)
//! - Memory: 语音网关、消息出口的内存实现

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
