//! Fake TTS Client - 用于测试的 TTS 客户端
//!
//! 返回固定的音色列表和固定的音频字节，不实际调用 TTS 服务

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::application::ports::{AudioStream, SynthesisRequest, TtsEnginePort, TtsError};
use crate::domain::VoiceEntry;

/// Fake TTS Client 配置
#[derive(Debug, Clone)]
pub struct FakeTtsClientConfig {
    /// 固定返回的音色列表
    pub voices: Vec<VoiceEntry>,
    /// 固定返回的音频数据
    pub audio: Bytes,
    /// 流式返回时每个分片的字节数
    pub chunk_size: usize,
}

impl Default for FakeTtsClientConfig {
    fn default() -> Self {
        Self {
            voices: vec![
                VoiceEntry::new("Rachel", "21m00Tcm4TlvDq8ikWAM"),
                VoiceEntry::new("Adam", "pNInz6obpgDQGcFmaJgB"),
                VoiceEntry::new("Bella", "EXAVITQu4vr4xnSDxMaL"),
            ],
            audio: Bytes::from_static(b"ID3\x04\x00fake-mp3-frames"),
            chunk_size: 4,
        }
    }
}

/// Fake TTS Client
///
/// 用于测试，记录调用次数，可切换为失败模式
pub struct FakeTtsClient {
    config: FakeTtsClientConfig,
    failing: AtomicBool,
    list_calls: AtomicUsize,
    synthesize_calls: AtomicUsize,
}

impl FakeTtsClient {
    pub fn new(config: FakeTtsClientConfig) -> Self {
        tracing::info!(
            voices = config.voices.len(),
            audio_size = config.audio.len(),
            "FakeTtsClient initialized"
        );
        Self {
            config,
            failing: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
            synthesize_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(FakeTtsClientConfig::default())
    }

    /// 切换失败模式，所有调用返回 ServiceError
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn synthesize_calls(&self) -> usize {
        self.synthesize_calls.load(Ordering::SeqCst)
    }

    fn check_failing(&self) -> Result<(), TtsError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(TtsError::ServiceError("HTTP 503: fake outage".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TtsEnginePort for FakeTtsClient {
    async fn list_voices(&self) -> Result<Vec<VoiceEntry>, TtsError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        Ok(self.config.voices.clone())
    }

    async fn synthesize_stream(&self, request: SynthesisRequest) -> Result<AudioStream, TtsError> {
        self.synthesize_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;

        tracing::debug!(
            text_len = request.text.len(),
            voice_id = %request.voice_id,
            model_id = %request.model_id,
            "FakeTtsClient: returning fixed audio"
        );

        let chunk_size = self.config.chunk_size.max(1);
        let audio = self.config.audio.clone();
        let chunks: Vec<Result<Bytes, TtsError>> = (0..audio.len())
            .step_by(chunk_size)
            .map(|start| Ok(audio.slice(start..(start + chunk_size).min(audio.len()))))
            .collect();

        Ok(stream::iter(chunks).boxed())
    }

    async fn health_check(&self) -> bool {
        !self.failing.load(Ordering::SeqCst)
    }
}
