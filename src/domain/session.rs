//! Guild Voice Session - 每个 guild 的语音连接状态

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Guild 唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GuildId(pub u64);

impl std::fmt::Display for GuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 语音频道唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub u64);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 语音频道引用（ID + 展示名）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceChannel {
    pub id: ChannelId,
    pub name: String,
}

impl VoiceChannel {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: ChannelId(id),
            name: name.into(),
        }
    }
}

/// 连接状态机
///
/// `Disconnected -> Connected -> Disconnected`，切换频道时经过 `Moving`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected(VoiceChannel),
    Moving {
        from: VoiceChannel,
        to: VoiceChannel,
    },
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connected(_) => "connected",
            ConnectionState::Moving { .. } => "moving",
        }
    }
}

/// 单个 guild 的语音会话
///
/// 首次 join 时创建，进程生命周期内不销毁；leave 只清空频道引用
#[derive(Debug, Clone)]
pub struct GuildVoiceSession {
    pub guild_id: GuildId,
    pub state: ConnectionState,
    pub connected_at: Option<DateTime<Utc>>,
    pub last_activity: DateTime<Utc>,
}

impl GuildVoiceSession {
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            state: ConnectionState::Disconnected,
            connected_at: None,
            last_activity: Utc::now(),
        }
    }

    /// 当前所在频道（`Moving` 期间视为仍在原频道）
    pub fn channel(&self) -> Option<&VoiceChannel> {
        match &self.state {
            ConnectionState::Connected(channel) => Some(channel),
            ConnectionState::Moving { from, .. } => Some(from),
            ConnectionState::Disconnected => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        !matches!(self.state, ConnectionState::Disconnected)
    }

    pub fn mark_connected(&mut self, channel: VoiceChannel) {
        let now = Utc::now();
        if !self.is_connected() {
            self.connected_at = Some(now);
        }
        self.state = ConnectionState::Connected(channel);
        self.last_activity = now;
    }

    pub fn mark_disconnected(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.connected_at = None;
        self.last_activity = Utc::now();
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_transitions() {
        let mut session = GuildVoiceSession::new(GuildId(1));
        assert!(!session.is_connected());
        assert!(session.channel().is_none());

        session.mark_connected(VoiceChannel::new(10, "general"));
        assert_eq!(session.state.as_str(), "connected");
        assert_eq!(session.channel().map(|c| c.id), Some(ChannelId(10)));
        assert!(session.connected_at.is_some());

        session.state = ConnectionState::Moving {
            from: VoiceChannel::new(10, "general"),
            to: VoiceChannel::new(11, "music"),
        };
        assert!(session.is_connected());
        assert_eq!(session.channel().map(|c| c.id), Some(ChannelId(10)));

        session.mark_disconnected();
        assert_eq!(session.state, ConnectionState::Disconnected);
        assert!(session.connected_at.is_none());
    }
}
