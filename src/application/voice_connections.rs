//! Voice Connection Manager - 每个 guild 的语音连接生命周期与播放闸门
//!
//! 不变量:
//! - 每个 guild 至多一个活动连接（状态迁移由 guild 级互斥锁串行化）
//! - 每个连接同一时刻至多一个播放（播放闸门，FIFO 等待）
//! - 不同 guild 之间互不竞争

use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use uuid::Uuid;

use crate::application::error::VoiceError;
use crate::application::ports::{GatewayError, VoiceGatewayPort};
use crate::domain::{ConnectionState, GuildId, GuildVoiceSession, VoiceChannel};

/// join 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// 新建连接
    Joined(VoiceChannel),
    /// 已连接到其他频道，执行了切换
    Moved { from: VoiceChannel, to: VoiceChannel },
    /// 已在目标频道，无操作
    AlreadyConnected(VoiceChannel),
}

impl JoinOutcome {
    pub fn acknowledgement(&self) -> String {
        match self {
            JoinOutcome::Joined(channel) => format!("Joined **{}**", channel.name),
            JoinOutcome::Moved { to, .. } => format!("Moved to **{}**", to.name),
            JoinOutcome::AlreadyConnected(channel) => format!("Already in **{}**", channel.name),
        }
    }
}

/// 一次播放的句柄
///
/// `finished()` 在音频输出端报告结束（或连接被断开）后返回
#[derive(Debug)]
pub struct PlaybackHandle {
    pub id: Uuid,
    pub guild_id: GuildId,
    done: oneshot::Receiver<()>,
}

impl PlaybackHandle {
    pub async fn finished(self) {
        let _ = self.done.await;
    }
}

/// guild 级状态槽
struct GuildSlot {
    session: Mutex<GuildVoiceSession>,
    /// 播放闸门，持有者即当前播放
    gate: Arc<Mutex<()>>,
    playing: Arc<AtomicBool>,
}

impl GuildSlot {
    fn new(guild_id: GuildId) -> Self {
        Self {
            session: Mutex::new(GuildVoiceSession::new(guild_id)),
            gate: Arc::new(Mutex::new(())),
            playing: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// 语音连接管理器
pub struct VoiceConnectionManager {
    gateway: Arc<dyn VoiceGatewayPort>,
    slots: DashMap<GuildId, Arc<GuildSlot>>,
}

impl VoiceConnectionManager {
    pub fn new(gateway: Arc<dyn VoiceGatewayPort>) -> Self {
        Self {
            gateway,
            slots: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 获取或创建 guild 槽（不跨 await 持有 DashMap 引用）
    fn slot(&self, guild: GuildId) -> Arc<GuildSlot> {
        self.slots
            .entry(guild)
            .or_insert_with(|| Arc::new(GuildSlot::new(guild)))
            .value()
            .clone()
    }

    fn existing_slot(&self, guild: GuildId) -> Option<Arc<GuildSlot>> {
        self.slots.get(&guild).map(|s| s.value().clone())
    }

    /// 加入语音频道
    ///
    /// - 未连接: 建立新连接
    /// - 已连接到其他频道: 切换（不会先断开再重连）
    /// - 已在同一频道: 幂等，仅返回确认
    pub async fn join(
        &self,
        guild: GuildId,
        channel: VoiceChannel,
    ) -> Result<JoinOutcome, VoiceError> {
        let slot = self.slot(guild);
        let mut session = slot.session.lock().await;

        let current = session.channel().cloned();
        match current {
            None => {
                self.gateway.connect(guild, &channel).await?;
                session.mark_connected(channel.clone());
                tracing::info!(
                    guild_id = %guild,
                    channel_id = %channel.id,
                    channel = %channel.name,
                    "Voice channel joined"
                );
                Ok(JoinOutcome::Joined(channel))
            }
            Some(current) if current.id == channel.id => {
                session.touch();
                tracing::debug!(guild_id = %guild, channel_id = %channel.id, "Already in channel");
                Ok(JoinOutcome::AlreadyConnected(current))
            }
            Some(current) => {
                session.state = ConnectionState::Moving {
                    from: current.clone(),
                    to: channel.clone(),
                };
                if let Err(e) = self.gateway.move_to(guild, &channel).await {
                    session.state = ConnectionState::Connected(current);
                    return Err(e.into());
                }
                session.mark_connected(channel.clone());
                tracing::info!(
                    guild_id = %guild,
                    from = %current.id,
                    to = %channel.id,
                    "Voice channel moved"
                );
                Ok(JoinOutcome::Moved {
                    from: current,
                    to: channel,
                })
            }
        }
    }

    /// 离开语音频道，返回离开前所在的频道
    pub async fn leave(&self, guild: GuildId) -> Result<VoiceChannel, VoiceError> {
        let slot = self.existing_slot(guild).ok_or(VoiceError::NotConnected)?;
        let mut session = slot.session.lock().await;

        let channel = session.channel().cloned().ok_or(VoiceError::NotConnected)?;
        self.gateway.disconnect(guild).await?;
        session.mark_disconnected();

        tracing::info!(guild_id = %guild, channel_id = %channel.id, "Voice channel left");
        Ok(channel)
    }

    /// 播放音频
    ///
    /// 等待该 guild 上一次播放结束后才开始；返回后音频已开始推送到输出端。
    /// 闸门由后台任务持有，直到输出端发出完成信号。
    pub async fn play(&self, guild: GuildId, audio: Bytes) -> Result<PlaybackHandle, VoiceError> {
        let slot = self.existing_slot(guild).ok_or(VoiceError::NotConnected)?;
        if !slot.session.lock().await.is_connected() {
            return Err(VoiceError::NotConnected);
        }

        let guard = slot.gate.clone().lock_owned().await;

        // 等待期间连接可能已断开，此时丢弃音频。
        // 会话锁一直持有到音频推送给网关，leave 无法插入其间
        let session = slot.session.lock().await;
        if !session.is_connected() {
            tracing::debug!(guild_id = %guild, "Connection closed while waiting, audio discarded");
            return Err(VoiceError::NotConnected);
        }

        slot.playing.store(true, Ordering::SeqCst);
        let bytes = audio.len();
        let result = self.gateway.play(guild, audio).await;
        drop(session);
        let completion = match result {
            Ok(completion) => completion,
            Err(e) => {
                slot.playing.store(false, Ordering::SeqCst);
                return Err(match e {
                    // 平台侧连接已不存在
                    GatewayError::NoConnection(_) => VoiceError::NotConnected,
                    other => other.into(),
                });
            }
        };

        let id = Uuid::new_v4();
        let (done_tx, done_rx) = oneshot::channel();
        let playing = slot.playing.clone();
        tokio::spawn(async move {
            // 发送端被丢弃同样视为结束
            let _ = completion.await;
            playing.store(false, Ordering::SeqCst);
            drop(guard);
            tracing::debug!(guild_id = %guild, playback_id = %id, "Playback finished");
            let _ = done_tx.send(());
        });

        tracing::info!(guild_id = %guild, playback_id = %id, bytes = bytes, "Playback started");
        Ok(PlaybackHandle {
            id,
            guild_id: guild,
            done: done_rx,
        })
    }

    pub fn is_playing(&self, guild: GuildId) -> bool {
        self.slots
            .get(&guild)
            .map(|s| s.playing.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    pub async fn state(&self, guild: GuildId) -> ConnectionState {
        match self.existing_slot(guild) {
            Some(slot) => slot.session.lock().await.state.clone(),
            None => ConnectionState::Disconnected,
        }
    }

    pub async fn current_channel(&self, guild: GuildId) -> Option<VoiceChannel> {
        let slot = self.existing_slot(guild)?;
        let session = slot.session.lock().await;
        session.channel().cloned()
    }

    /// 曾经连接过的 guild 列表
    pub fn guilds(&self) -> Vec<GuildId> {
        self.slots.iter().map(|e| *e.key()).collect()
    }
}
