//! Application Context
//!
//! 持有所有流水线与共享状态，供命令入口使用

use std::sync::Arc;

use crate::application::chat_pipeline::{ChatPipeline, ChatPipelineConfig};
use crate::application::image_pipeline::{ImagePipeline, ImagePipelineConfig};
use crate::application::ports::{GenAiPort, TtsEnginePort, VoiceGatewayPort};
use crate::application::tts_pipeline::{TtsPipeline, TtsPipelineConfig};
use crate::application::voice_catalog::VoiceCatalog;
use crate::application::voice_connections::VoiceConnectionManager;
use crate::config::AppConfig;

/// 应用上下文
pub struct AppContext {
    // ========== Ports ==========
    pub tts_engine: Arc<dyn TtsEnginePort>,
    pub gateway: Arc<dyn VoiceGatewayPort>,

    // ========== Shared State ==========
    pub catalog: Arc<VoiceCatalog>,
    pub voices: Arc<VoiceConnectionManager>,

    // ========== Pipelines ==========
    pub tts: TtsPipeline,
    pub chat: Arc<ChatPipeline>,
    pub image: ImagePipeline,
}

impl AppContext {
    /// 创建应用上下文
    ///
    /// `genai` 为 None 时对话与图像命令回复未配置提示
    pub fn new(
        config: &AppConfig,
        tts_engine: Arc<dyn TtsEnginePort>,
        genai: Option<Arc<dyn GenAiPort>>,
        gateway: Arc<dyn VoiceGatewayPort>,
    ) -> Self {
        let catalog = Arc::new(VoiceCatalog::new());
        let voices = Arc::new(VoiceConnectionManager::new(gateway.clone()));

        let tts = TtsPipeline::new(
            catalog.clone(),
            tts_engine.clone(),
            voices.clone(),
            TtsPipelineConfig {
                default_voice: config.elevenlabs.default_voice.clone(),
                model_id: config.elevenlabs.model_id.clone(),
                output_format: config.elevenlabs.output_format.clone(),
            },
        );

        let chat = Arc::new(ChatPipeline::new(
            genai.clone(),
            ChatPipelineConfig {
                model: config.gemini.chat_model.clone(),
                thinking_budget: config.gemini.thinking_budget,
                chunk_size: config.chat.chunk_size,
                message_limit: config.chat.message_limit,
                bot_user_id: config.discord.bot_user_id,
            },
        ));

        let image = ImagePipeline::new(
            genai,
            ImagePipelineConfig {
                model: config.gemini.image_model.clone(),
            },
        );

        Self {
            tts_engine,
            gateway,
            catalog,
            voices,
            tts,
            chat,
            image,
        }
    }

    /// 启动时加载音色目录；失败只记录日志，目录保持为空
    pub async fn load_voices(&self) -> usize {
        match self.catalog.load(self.tts_engine.as_ref()).await {
            Ok(count) => count,
            Err(_) => {
                tracing::warn!("Voice catalog is empty; TTS commands will report no voices loaded");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::TtsPipelineError;
    use crate::application::tts_pipeline::SpeakRequest;
    use crate::domain::{GuildId, VoiceChannel};
    use crate::infrastructure::adapters::FakeTtsClient;
    use crate::infrastructure::memory::InMemoryVoiceGateway;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.discord.token = "t".to_string();
        config.elevenlabs.api_key = "k".to_string();
        config.elevenlabs.default_voice = "Adam".to_string();
        config
    }

    #[tokio::test]
    async fn test_load_and_speak_with_default_voice() {
        let engine = Arc::new(FakeTtsClient::with_defaults());
        let gateway = InMemoryVoiceGateway::manual().arc();
        let ctx = AppContext::new(&config(), engine, None, gateway.clone());

        assert_eq!(ctx.load_voices().await, 3);

        let outcome = ctx
            .tts
            .speak(SpeakRequest {
                guild: GuildId(1),
                caller_channel: Some(VoiceChannel::new(10, "General")),
                voice: None,
                text: "hello".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(outcome.voice_name, "Adam");
        assert_eq!(gateway.active_playbacks(GuildId(1)), 1);
        assert!(!ctx.chat.is_configured());
    }

    #[tokio::test]
    async fn test_failed_load_leaves_catalog_empty() {
        let engine = Arc::new(FakeTtsClient::with_defaults());
        engine.set_failing(true);
        let ctx = AppContext::new(
            &config(),
            engine,
            None,
            InMemoryVoiceGateway::manual().arc(),
        );

        assert_eq!(ctx.load_voices().await, 0);
        assert!(matches!(
            ctx.tts.list_voices(),
            Err(TtsPipelineError::CatalogEmpty)
        ));
    }
}
