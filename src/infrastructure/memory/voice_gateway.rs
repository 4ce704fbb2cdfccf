//! In-Memory Voice Gateway Implementation
//!
//! 记录连接 / 切换 / 断开调用，并模拟频道音频输出端：
//! 每次播放结束时恰好发送一次完成信号

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::application::ports::{GatewayError, PlaybackCompletion, VoiceGatewayPort};
use crate::domain::{GuildId, VoiceChannel};

/// 播放完成方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    /// 由调用方通过 `finish_playback` 手动结束
    Manual,
    /// 按码率估算时长后自动结束
    Timed { bytes_per_sec: u64 },
}

/// 网关事件（按发生顺序记录）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    Connected { guild: GuildId, channel: VoiceChannel },
    Moved { guild: GuildId, channel: VoiceChannel },
    Disconnected { guild: GuildId },
    PlaybackStarted { guild: GuildId, bytes: usize },
    PlaybackFinished { guild: GuildId },
}

/// 尚未结束的播放，按开始顺序排列
type ActivePlaybacks = DashMap<GuildId, VecDeque<(Uuid, oneshot::Sender<()>)>>;

/// 内存语音网关
pub struct InMemoryVoiceGateway {
    mode: PlaybackMode,
    connections: DashMap<GuildId, VoiceChannel>,
    active: Arc<ActivePlaybacks>,
    events: Arc<Mutex<Vec<GatewayEvent>>>,
    /// 为 true 时 connect / move_to / play 返回错误
    failing: AtomicBool,
    connect_calls: AtomicUsize,
    move_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
}

impl InMemoryVoiceGateway {
    pub fn new(mode: PlaybackMode) -> Self {
        Self {
            mode,
            connections: DashMap::new(),
            active: Arc::new(DashMap::new()),
            events: Arc::new(Mutex::new(Vec::new())),
            failing: AtomicBool::new(false),
            connect_calls: AtomicUsize::new(0),
            move_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
        }
    }

    pub fn manual() -> Self {
        Self::new(PlaybackMode::Manual)
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 模拟平台故障
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn is_failing(&self) -> bool {
        self.failing.load(Ordering::SeqCst)
    }

    /// 结束该 guild 最早开始的一次播放
    pub fn finish_playback(&self, guild: GuildId) -> bool {
        let sender = self
            .active
            .get_mut(&guild)
            .and_then(|mut q| q.pop_front());
        signal_finished(&self.events, guild, sender.map(|(_, tx)| tx))
    }

    pub fn active_playbacks(&self, guild: GuildId) -> usize {
        self.active.get(&guild).map(|q| q.len()).unwrap_or(0)
    }

    pub fn channel(&self, guild: GuildId) -> Option<VoiceChannel> {
        self.connections.get(&guild).map(|c| c.clone())
    }

    pub fn events(&self) -> Vec<GatewayEvent> {
        self.events.lock().clone()
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn move_calls(&self) -> usize {
        self.move_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    fn record(&self, event: GatewayEvent) {
        self.events.lock().push(event);
    }
}

impl Default for InMemoryVoiceGateway {
    fn default() -> Self {
        Self::manual()
    }
}

/// 结束指定的一次播放；已被断开丢弃时无操作
fn finish_by_id(
    active: &ActivePlaybacks,
    events: &Mutex<Vec<GatewayEvent>>,
    guild: GuildId,
    id: Uuid,
) -> bool {
    let sender = active.get_mut(&guild).and_then(|mut q| {
        let pos = q.iter().position(|(pending, _)| *pending == id)?;
        q.remove(pos)
    });
    signal_finished(events, guild, sender.map(|(_, tx)| tx))
}

fn signal_finished(
    events: &Mutex<Vec<GatewayEvent>>,
    guild: GuildId,
    sender: Option<oneshot::Sender<()>>,
) -> bool {
    match sender {
        Some(tx) => {
            // 先记录事件再发信号，保证事件顺序与观察顺序一致
            events.lock().push(GatewayEvent::PlaybackFinished { guild });
            let _ = tx.send(());
            true
        }
        None => false,
    }
}

#[async_trait]
impl VoiceGatewayPort for InMemoryVoiceGateway {
    async fn connect(&self, guild: GuildId, channel: &VoiceChannel) -> Result<(), GatewayError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.is_failing() {
            return Err(GatewayError::ConnectionFailed(format!(
                "cannot reach channel {}",
                channel.id
            )));
        }
        self.connections.insert(guild, channel.clone());
        self.record(GatewayEvent::Connected {
            guild,
            channel: channel.clone(),
        });
        tracing::debug!(guild_id = %guild, channel_id = %channel.id, "Gateway connected");
        Ok(())
    }

    async fn move_to(&self, guild: GuildId, channel: &VoiceChannel) -> Result<(), GatewayError> {
        self.move_calls.fetch_add(1, Ordering::SeqCst);
        if self.is_failing() {
            return Err(GatewayError::ConnectionFailed(format!(
                "cannot move to channel {}",
                channel.id
            )));
        }
        let mut current = self
            .connections
            .get_mut(&guild)
            .ok_or(GatewayError::NoConnection(guild))?;
        *current = channel.clone();
        drop(current);
        self.record(GatewayEvent::Moved {
            guild,
            channel: channel.clone(),
        });
        tracing::debug!(guild_id = %guild, channel_id = %channel.id, "Gateway moved");
        Ok(())
    }

    async fn disconnect(&self, guild: GuildId) -> Result<(), GatewayError> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.connections
            .remove(&guild)
            .ok_or(GatewayError::NoConnection(guild))?;
        // 丢弃发送端即通知所有正在播放的任务结束
        self.active.remove(&guild);
        self.record(GatewayEvent::Disconnected { guild });
        tracing::debug!(guild_id = %guild, "Gateway disconnected");
        Ok(())
    }

    async fn play(&self, guild: GuildId, audio: Bytes) -> Result<PlaybackCompletion, GatewayError> {
        if !self.connections.contains_key(&guild) {
            return Err(GatewayError::NoConnection(guild));
        }
        if self.is_failing() {
            return Err(GatewayError::PlaybackFailed("audio sink unavailable".to_string()));
        }

        let id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.record(GatewayEvent::PlaybackStarted {
            guild,
            bytes: audio.len(),
        });
        self.active.entry(guild).or_default().push_back((id, tx));

        if let PlaybackMode::Timed { bytes_per_sec } = self.mode {
            let millis = (audio.len() as u64 * 1000) / bytes_per_sec.max(1);
            let active = self.active.clone();
            let events = self.events.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(millis)).await;
                finish_by_id(&active, &events, guild, id);
            });
        }

        tracing::debug!(guild_id = %guild, bytes = audio.len(), "Gateway playback started");
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_playback_signals_once() {
        let gateway = InMemoryVoiceGateway::manual();
        let guild = GuildId(1);
        gateway
            .connect(guild, &VoiceChannel::new(10, "general"))
            .await
            .unwrap();

        let rx = gateway.play(guild, Bytes::from_static(b"mp3")).await.unwrap();
        assert_eq!(gateway.active_playbacks(guild), 1);

        assert!(gateway.finish_playback(guild));
        assert!(!gateway.finish_playback(guild));
        assert!(rx.await.is_ok());
    }

    #[tokio::test]
    async fn test_play_without_connection_fails() {
        let gateway = InMemoryVoiceGateway::manual();
        let result = gateway.play(GuildId(1), Bytes::new()).await;
        assert!(matches!(result, Err(GatewayError::NoConnection(_))));
    }

    #[tokio::test]
    async fn test_disconnect_ends_active_playback() {
        let gateway = InMemoryVoiceGateway::manual();
        let guild = GuildId(1);
        gateway
            .connect(guild, &VoiceChannel::new(10, "general"))
            .await
            .unwrap();
        let rx = gateway.play(guild, Bytes::from_static(b"mp3")).await.unwrap();

        gateway.disconnect(guild).await.unwrap();
        // 发送端被丢弃，接收端立即结束
        assert!(rx.await.is_err());
        assert_eq!(gateway.channel(guild), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_playback_completes_after_duration() {
        let gateway = InMemoryVoiceGateway::new(PlaybackMode::Timed {
            bytes_per_sec: 1000,
        });
        let guild = GuildId(1);
        gateway
            .connect(guild, &VoiceChannel::new(10, "general"))
            .await
            .unwrap();

        let rx = gateway.play(guild, Bytes::from(vec![0u8; 500])).await.unwrap();
        assert!(rx.await.is_ok());
        assert_eq!(gateway.active_playbacks(guild), 0);
        assert_eq!(
            gateway.events().last(),
            Some(&GatewayEvent::PlaybackFinished { guild })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_does_not_end_later_playback() {
        let gateway = InMemoryVoiceGateway::new(PlaybackMode::Timed {
            bytes_per_sec: 1000,
        });
        let guild = GuildId(1);
        let channel = VoiceChannel::new(10, "general");
        gateway.connect(guild, &channel).await.unwrap();

        // 1 秒的播放，中途断开
        let first = gateway.play(guild, Bytes::from(vec![0u8; 1000])).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        gateway.disconnect(guild).await.unwrap();
        assert!(first.await.is_err());

        // 重新连接后开始 10 秒的播放
        gateway.connect(guild, &channel).await.unwrap();
        let mut second = gateway
            .play(guild, Bytes::from(vec![0u8; 10_000]))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(gateway.active_playbacks(guild), 1);
        assert!(second.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert!(second.await.is_ok());
        assert_eq!(gateway.active_playbacks(guild), 0);
    }

    #[tokio::test]
    async fn test_failing_gateway_rejects_operations() {
        let gateway = InMemoryVoiceGateway::manual();
        let guild = GuildId(1);
        gateway
            .connect(guild, &VoiceChannel::new(10, "general"))
            .await
            .unwrap();

        gateway.set_failing(true);
        assert!(matches!(
            gateway.move_to(guild, &VoiceChannel::new(11, "music")).await,
            Err(GatewayError::ConnectionFailed(_))
        ));
        assert!(matches!(
            gateway.play(guild, Bytes::from_static(b"mp3")).await,
            Err(GatewayError::PlaybackFailed(_))
        ));
        assert_eq!(gateway.channel(guild), Some(VoiceChannel::new(10, "general")));
        assert_eq!(gateway.active_playbacks(guild), 0);
    }
}
