//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 聊天平台配置
    #[serde(default)]
    pub discord: DiscordConfig,

    /// TTS 提供方配置
    #[serde(default)]
    pub elevenlabs: ElevenLabsConfig,

    /// 生成式 AI 提供方配置
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// 对话切分配置
    #[serde(default)]
    pub chat: ChatConfig,

    /// 本地音频输出配置
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 聊天平台配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscordConfig {
    /// bot 凭证（必填）
    #[serde(default)]
    pub token: String,

    /// 指定 guild 时只在该 guild 注册命令（生效更快）
    #[serde(default)]
    pub guild_id: Option<u64>,

    /// bot 自身用户 ID，用于去除 @提及
    #[serde(default)]
    pub bot_user_id: Option<u64>,
}

/// TTS 提供方配置
#[derive(Debug, Clone, Deserialize)]
pub struct ElevenLabsConfig {
    /// API 凭证（必填）
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_elevenlabs_url")]
    pub base_url: String,

    #[serde(default = "default_model_id")]
    pub model_id: String,

    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// 未指定音色时使用
    #[serde(default = "default_voice")]
    pub default_voice: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_elevenlabs_url() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_model_id() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_output_format() -> String {
    "mp3_44100_128".to_string()
}

fn default_voice() -> String {
    "Rachel".to_string()
}

fn default_timeout() -> u64 {
    120
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_elevenlabs_url(),
            model_id: default_model_id(),
            output_format: default_output_format(),
            default_voice: default_voice(),
            timeout_secs: default_timeout(),
        }
    }
}

/// 生成式 AI 提供方配置
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    /// API 凭证（可选，缺失时对话与图像功能降级）
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_gemini_url")]
    pub base_url: String,

    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// 对话的思考 token 预算
    #[serde(default = "default_thinking_budget")]
    pub thinking_budget: i32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_gemini_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_chat_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

fn default_thinking_budget() -> i32 {
    1024
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_gemini_url(),
            chat_model: default_chat_model(),
            image_model: default_image_model(),
            thinking_budget: default_thinking_budget(),
            timeout_secs: default_timeout(),
        }
    }
}

impl GeminiConfig {
    /// 非空的 API 凭证
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

/// 对话切分配置
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// 平台单条消息字符上限
    #[serde(default = "default_message_limit")]
    pub message_limit: usize,

    /// 切片大小，必须小于 message_limit
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_message_limit() -> usize {
    2000
}

fn default_chunk_size() -> usize {
    1900
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            message_limit: default_message_limit(),
            chunk_size: default_chunk_size(),
        }
    }
}

/// 本地音频输出配置
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// 估算播放时长使用的码率（字节/秒）
    #[serde(default = "default_bytes_per_sec")]
    pub bytes_per_sec: u64,
}

fn default_bytes_per_sec() -> u64 {
    16_000 // 128kbps
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            bytes_per_sec: default_bytes_per_sec(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.elevenlabs.model_id, "eleven_multilingual_v2");
        assert_eq!(config.elevenlabs.output_format, "mp3_44100_128");
        assert_eq!(config.elevenlabs.default_voice, "Rachel");
        assert_eq!(config.chat.chunk_size, 1900);
        assert!(config.gemini.api_key().is_none());
    }

    #[test]
    fn test_blank_gemini_key_is_absent() {
        let config = GeminiConfig {
            api_key: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(config.api_key().is_none());
    }
}
