//! Zerbania - 语音频道 TTS 与生成式 AI 聊天机器人
//!
//! 启动顺序：
//! - 加载配置（缺少凭证直接退出）
//! - 构建 ElevenLabs / Gemini 客户端与语音网关
//! - 加载音色目录（失败不致命）
//! - 等待关闭信号后断开所有语音连接

use std::sync::Arc;

use zerbania::application::ports::{GenAiPort, TtsEnginePort};
use zerbania::application::AppContext;
use zerbania::config::{load_config, print_config};
use zerbania::infrastructure::adapters::{
    ElevenLabsClient, ElevenLabsClientConfig, GeminiClient, GeminiClientConfig,
};
use zerbania::infrastructure::memory::{InMemoryVoiceGateway, PlaybackMode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    // 初始化日志
    let log_filter = format!("{},zerbania={}", config.log.level, config.log.level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter)),
        )
        .init();

    tracing::info!("Zerbania - voice TTS & chat bot");
    print_config(&config);

    // 创建 ElevenLabs TTS 引擎
    let tts_config = ElevenLabsClientConfig::new(config.elevenlabs.api_key.clone())
        .with_base_url(config.elevenlabs.base_url.clone())
        .with_timeout(config.elevenlabs.timeout_secs);
    let tts_engine: Arc<dyn TtsEnginePort> = Arc::new(ElevenLabsClient::new(tts_config)?);

    if !tts_engine.health_check().await {
        tracing::warn!("ElevenLabs health check failed, continuing anyway");
    }

    // 创建 Gemini 客户端（可选）
    let genai: Option<Arc<dyn GenAiPort>> = match config.gemini.api_key() {
        Some(key) => {
            let gemini_config = GeminiClientConfig::new(key)
                .with_base_url(config.gemini.base_url.clone())
                .with_timeout(config.gemini.timeout_secs);
            Some(Arc::new(GeminiClient::new(gemini_config)?))
        }
        None => {
            tracing::warn!("GEMINI_API_KEY not set, chat and image commands are disabled");
            None
        }
    };

    // 创建语音网关
    let gateway = InMemoryVoiceGateway::new(PlaybackMode::Timed {
        bytes_per_sec: config.playback.bytes_per_sec,
    })
    .arc();

    let ctx = AppContext::new(&config, tts_engine, genai, gateway);

    let count = ctx.load_voices().await;
    tracing::info!(voices = count, "Bot ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal");

    for guild in ctx.voices.guilds() {
        if let Err(e) = ctx.voices.leave(guild).await {
            tracing::debug!(guild_id = %guild, error = %e, "Leave on shutdown skipped");
        }
    }

    tracing::info!("Shutdown complete");

    Ok(())
}
