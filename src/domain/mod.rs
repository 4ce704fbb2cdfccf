//! Domain Layer - 领域层
//!
//! 纯数据与算法，不做 I/O:
//! - catalog: 音色目录快照
//! - session: guild 语音会话状态机
//! - message: 提及去除、长消息切分
//! - media: 附件 MIME 校验与扩展名推导

pub mod catalog;
pub mod media;
pub mod message;
pub mod session;

pub use catalog::{VoiceEntry, VoiceSnapshot, MAX_SUGGESTIONS};
pub use session::{ChannelId, ConnectionState, GuildId, GuildVoiceSession, VoiceChannel};

