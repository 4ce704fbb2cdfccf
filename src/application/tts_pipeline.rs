//! TTS Pipeline - 音色解析 -> 流式合成 -> 播放或文件交付
//!
//! 合成结果完整收集到一个缓冲区后才交付，不做边合成边播放

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use std::sync::Arc;

use crate::application::error::{TtsPipelineError, VoiceError};
use crate::application::ports::{FileAttachment, SynthesisRequest, TtsEnginePort};
use crate::application::voice_catalog::VoiceCatalog;
use crate::application::voice_connections::{JoinOutcome, PlaybackHandle, VoiceConnectionManager};
use crate::domain::message::truncate_preview;
use crate::domain::{GuildId, VoiceChannel};

/// 播放确认消息中文本预览的长度
const SPEAK_PREVIEW_CHARS: usize = 100;
/// 附件描述中文本预览的长度
const FILE_DESCRIPTION_CHARS: usize = 50;
const TTS_FILENAME: &str = "tts.mp3";

/// TTS 流水线配置
#[derive(Debug, Clone)]
pub struct TtsPipelineConfig {
    /// 未指定音色时使用
    pub default_voice: String,
    pub model_id: String,
    pub output_format: String,
}

impl Default for TtsPipelineConfig {
    fn default() -> Self {
        Self {
            default_voice: "Rachel".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
            output_format: "mp3_44100_128".to_string(),
        }
    }
}

/// 实时播放请求
#[derive(Debug, Clone)]
pub struct SpeakRequest {
    pub guild: GuildId,
    /// 调用者当前所在的语音频道
    pub caller_channel: Option<VoiceChannel>,
    pub voice: Option<String>,
    pub text: String,
}

/// 合成后的音频
#[derive(Debug, Clone)]
pub struct SpokenAudio {
    pub voice_name: String,
    pub audio: Bytes,
}

/// 实时播放结果
#[derive(Debug)]
pub struct SpeakOutcome {
    pub voice_name: String,
    pub text: String,
    pub join: JoinOutcome,
    pub playback: PlaybackHandle,
}

impl SpeakOutcome {
    pub fn acknowledgement(&self) -> String {
        format!(
            "Speaking: *{}* (voice: {})",
            truncate_preview(&self.text, SPEAK_PREVIEW_CHARS),
            self.voice_name
        )
    }
}

/// 文件交付结果
#[derive(Debug, Clone)]
pub struct TtsFile {
    pub voice_name: String,
    pub attachment: FileAttachment,
}

impl TtsFile {
    pub fn message(&self) -> String {
        format!("Generated with voice: **{}**", self.voice_name)
    }
}

/// TTS 流水线
pub struct TtsPipeline {
    catalog: Arc<VoiceCatalog>,
    engine: Arc<dyn TtsEnginePort>,
    voices: Arc<VoiceConnectionManager>,
    config: TtsPipelineConfig,
}

impl TtsPipeline {
    pub fn new(
        catalog: Arc<VoiceCatalog>,
        engine: Arc<dyn TtsEnginePort>,
        voices: Arc<VoiceConnectionManager>,
        config: TtsPipelineConfig,
    ) -> Self {
        Self {
            catalog,
            engine,
            voices,
            config,
        }
    }

    /// 解析音色名（未指定时使用默认音色），返回 (name, voice_id)
    pub fn resolve_voice(
        &self,
        requested: Option<&str>,
    ) -> Result<(String, String), TtsPipelineError> {
        let name = requested
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(self.config.default_voice.as_str());

        let snapshot = self.catalog.snapshot();
        if snapshot.is_empty() {
            return Err(TtsPipelineError::CatalogEmpty);
        }
        snapshot
            .resolve(name)
            .map(|id| (name.to_string(), id.to_string()))
            .ok_or_else(|| TtsPipelineError::VoiceNotFound(name.to_string()))
    }

    /// 流式合成并收集全部字节
    pub async fn synthesize(
        &self,
        voice: Option<&str>,
        text: &str,
    ) -> Result<SpokenAudio, TtsPipelineError> {
        let (voice_name, voice_id) = self.resolve_voice(voice)?;

        let request = SynthesisRequest {
            text: text.to_string(),
            voice_id,
            model_id: self.config.model_id.clone(),
            output_format: self.config.output_format.clone(),
        };
        let mut stream = self.engine.synthesize_stream(request).await?;

        let mut buffer = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        if buffer.is_empty() {
            return Err(TtsPipelineError::EmptyGenerationResult);
        }

        tracing::info!(
            voice = %voice_name,
            text_len = text.len(),
            audio_size = buffer.len(),
            "Speech synthesized"
        );

        Ok(SpokenAudio {
            voice_name,
            audio: buffer.freeze(),
        })
    }

    /// 实时播放
    ///
    /// 1. 解析音色（失败时不调用提供方）
    /// 2. 调用者必须在语音频道中；自动加入或切换到该频道
    /// 3. 合成
    /// 4. 等待该 guild 的播放闸门空闲后开始播放
    pub async fn speak(&self, request: SpeakRequest) -> Result<SpeakOutcome, TtsPipelineError> {
        self.resolve_voice(request.voice.as_deref())?;

        let channel = request
            .caller_channel
            .clone()
            .ok_or(VoiceError::NoVoiceChannel)?;
        let join = self.voices.join(request.guild, channel).await?;

        let spoken = self
            .synthesize(request.voice.as_deref(), &request.text)
            .await?;
        let playback = self.voices.play(request.guild, spoken.audio).await?;

        Ok(SpeakOutcome {
            voice_name: spoken.voice_name,
            text: request.text,
            join,
            playback,
        })
    }

    /// 文件交付，不需要语音连接
    pub async fn render_file(
        &self,
        voice: Option<&str>,
        text: &str,
    ) -> Result<TtsFile, TtsPipelineError> {
        let spoken = self.synthesize(voice, text).await?;
        Ok(TtsFile {
            voice_name: spoken.voice_name,
            attachment: FileAttachment {
                filename: TTS_FILENAME.to_string(),
                description: Some(format!(
                    "TTS: {}...",
                    text.chars().take(FILE_DESCRIPTION_CHARS).collect::<String>()
                )),
                data: spoken.audio,
            },
        })
    }

    /// 列表视图：排序后的全部音色名
    pub fn list_voices(&self) -> Result<Vec<String>, TtsPipelineError> {
        let names = self.catalog.sorted_names();
        if names.is_empty() {
            return Err(TtsPipelineError::CatalogEmpty);
        }
        Ok(names)
    }

    /// 自动补全
    pub fn suggest_voices(&self, fragment: &str) -> Vec<String> {
        self.catalog.suggest(fragment)
    }
}
