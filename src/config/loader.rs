//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 兼容旧部署的裸环境变量（`DISCORD_TOKEN` 等）
//! 2. 带前缀的环境变量
//! 3. 配置文件（config.toml）
//! 4. 默认值

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 裸环境变量 -> 配置键
const PLAIN_ENV_KEYS: &[(&str, &str)] = &[
    ("DISCORD_TOKEN", "discord.token"),
    ("ELEVENLABS_API_KEY", "elevenlabs.api_key"),
    ("GEMINI_API_KEY", "gemini.api_key"),
    ("DEFAULT_VOICE", "elevenlabs.default_voice"),
];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. `DISCORD_TOKEN`、`ELEVENLABS_API_KEY`、`GEMINI_API_KEY`、`DEFAULT_VOICE`、`GUILD_ID`
/// 2. 环境变量（前缀 `ZERBANIA_`，层级分隔符 `__`）
/// 3. 配置文件（config.toml 或 config.local.toml）
/// 4. 默认值
///
/// # 环境变量示例
/// - `ZERBANIA_ELEVENLABS__MODEL_ID=eleven_turbo_v2_5`
/// - `ZERBANIA_GEMINI__THINKING_BUDGET=512`
/// - `ZERBANIA_DISCORD__BOT_USER_ID=1234567890`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    load_with_env(config_path, |key| std::env::var(key).ok())
}

fn load_with_env<F>(config_path: Option<&Path>, lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("elevenlabs.base_url", "https://api.elevenlabs.io")?
        .set_default("elevenlabs.model_id", "eleven_multilingual_v2")?
        .set_default("elevenlabs.output_format", "mp3_44100_128")?
        .set_default("elevenlabs.default_voice", "Rachel")?
        .set_default("elevenlabs.timeout_secs", 120)?
        .set_default(
            "gemini.base_url",
            "https://generativelanguage.googleapis.com/v1beta",
        )?
        .set_default("gemini.chat_model", "gemini-2.5-flash")?
        .set_default("gemini.image_model", "gemini-2.5-flash-image")?
        .set_default("gemini.thinking_budget", 1024)?
        .set_default("gemini.timeout_secs", 120)?
        .set_default("chat.message_limit", 2000)?
        .set_default("chat.chunk_size", 1900)?
        .set_default("playback.bytes_per_sec", 16_000)?
        .set_default("log.level", "info")?;

    // 2. 配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 带前缀的环境变量
    // 例如: ZERBANIA_CHAT__CHUNK_SIZE=1500
    builder = builder.add_source(
        Environment::with_prefix("ZERBANIA")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    // 4. 裸环境变量（最高优先级）
    builder = apply_plain_env(builder, &lookup)?;

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

fn apply_plain_env<F>(
    mut builder: ConfigBuilder<DefaultState>,
    lookup: &F,
) -> Result<ConfigBuilder<DefaultState>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    for (var, key) in PLAIN_ENV_KEYS {
        let value = lookup(*var).filter(|v| !v.trim().is_empty());
        builder = builder.set_override_option(*key, value)?;
    }

    if let Some(raw) = lookup("GUILD_ID").filter(|v| !v.trim().is_empty()) {
        let guild_id: u64 = raw.trim().parse().map_err(|_| {
            ConfigError::ValidationError(format!("GUILD_ID is not a valid id: {}", raw))
        })?;
        // config 的整数类型为 i64
        let guild_id = i64::try_from(guild_id).map_err(|_| {
            ConfigError::ValidationError(format!("GUILD_ID out of range: {}", raw))
        })?;
        builder = builder.set_override("discord.guild_id", guild_id)?;
    }

    Ok(builder)
}

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.discord.token.trim().is_empty() {
        return Err(ConfigError::Missing("DISCORD_TOKEN"));
    }

    if config.elevenlabs.api_key.trim().is_empty() {
        return Err(ConfigError::Missing("ELEVENLABS_API_KEY"));
    }

    if config.elevenlabs.base_url.is_empty() {
        return Err(ConfigError::ValidationError(
            "ElevenLabs base URL cannot be empty".to_string(),
        ));
    }

    if config.elevenlabs.default_voice.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Default voice cannot be empty".to_string(),
        ));
    }

    if config.elevenlabs.timeout_secs == 0 || config.gemini.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Provider timeout cannot be 0".to_string(),
        ));
    }

    if config.chat.chunk_size == 0 || config.chat.chunk_size >= config.chat.message_limit {
        return Err(ConfigError::ValidationError(format!(
            "Chat chunk size must be in 1..{} (got {})",
            config.chat.message_limit, config.chat.chunk_size
        )));
    }

    if config.playback.bytes_per_sec == 0 {
        return Err(ConfigError::ValidationError(
            "Playback bytes_per_sec cannot be 0".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志，不输出凭证）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    match config.discord.guild_id {
        Some(id) => tracing::info!("Command Scope: guild {}", id),
        None => tracing::info!("Command Scope: global"),
    }
    tracing::info!("ElevenLabs URL: {}", config.elevenlabs.base_url);
    tracing::info!("ElevenLabs Model: {}", config.elevenlabs.model_id);
    tracing::info!("Output Format: {}", config.elevenlabs.output_format);
    tracing::info!("Default Voice: {}", config.elevenlabs.default_voice);
    tracing::info!("ElevenLabs Timeout: {}s", config.elevenlabs.timeout_secs);
    if config.gemini.api_key().is_some() {
        tracing::info!("Gemini URL: {}", config.gemini.base_url);
        tracing::info!("Chat Model: {}", config.gemini.chat_model);
        tracing::info!("Image Model: {}", config.gemini.image_model);
        tracing::info!("Thinking Budget: {}", config.gemini.thinking_budget);
    } else {
        tracing::info!("Gemini: disabled (no API key)");
    }
    tracing::info!(
        "Chat Chunking: {} / {}",
        config.chat.chunk_size,
        config.chat.message_limit
    );
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.discord.token = "token".to_string();
        config.elevenlabs.api_key = "key".to_string();
        config
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_validation_passes_for_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_credentials() {
        let config = AppConfig::default();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Missing("DISCORD_TOKEN"))
        ));

        let mut config = valid_config();
        config.elevenlabs.api_key = " ".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Missing("ELEVENLABS_API_KEY"))
        ));
    }

    #[test]
    fn test_validation_error_for_chunk_size() {
        let mut config = valid_config();
        config.chat.chunk_size = 2000;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));

        config.chat.chunk_size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_timeout() {
        let mut config = valid_config();
        config.gemini.timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_plain_env_overrides_file() {
        let file = write_config(
            r#"
[discord]
token = "from-file"

[elevenlabs]
api_key = "file-key"
default_voice = "Adam"
"#,
        );

        let config = load_with_env(
            Some(file.path()),
            env(&[
                ("DISCORD_TOKEN", "from-env"),
                ("DEFAULT_VOICE", "Bella"),
                ("GUILD_ID", "123456789012345678"),
            ]),
        )
        .unwrap();

        assert_eq!(config.discord.token, "from-env");
        assert_eq!(config.discord.guild_id, Some(123456789012345678));
        assert_eq!(config.elevenlabs.api_key, "file-key");
        assert_eq!(config.elevenlabs.default_voice, "Bella");
        assert_eq!(config.elevenlabs.model_id, "eleven_multilingual_v2");
        assert!(config.gemini.api_key().is_none());
    }

    #[test]
    fn test_file_sections_and_defaults() {
        let file = write_config(
            r#"
[discord]
token = "t"
bot_user_id = 42

[elevenlabs]
api_key = "k"

[gemini]
api_key = "g"
thinking_budget = 256

[chat]
chunk_size = 1500
"#,
        );

        let config = load_with_env(Some(file.path()), env(&[])).unwrap();
        assert_eq!(config.discord.bot_user_id, Some(42));
        assert_eq!(config.gemini.api_key(), Some("g"));
        assert_eq!(config.gemini.thinking_budget, 256);
        assert_eq!(config.gemini.chat_model, "gemini-2.5-flash");
        assert_eq!(config.chat.chunk_size, 1500);
        assert_eq!(config.chat.message_limit, 2000);
        assert_eq!(config.playback.bytes_per_sec, 16_000);
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let file = write_config("[elevenlabs]\napi_key = \"k\"\n");
        let result = load_with_env(Some(file.path()), env(&[]));
        assert!(matches!(result, Err(ConfigError::Missing("DISCORD_TOKEN"))));
    }

    #[test]
    fn test_invalid_guild_id() {
        let file = write_config("");
        let result = load_with_env(
            Some(file.path()),
            env(&[
                ("DISCORD_TOKEN", "t"),
                ("ELEVENLABS_API_KEY", "k"),
                ("GUILD_ID", "not-a-number"),
            ]),
        );
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
