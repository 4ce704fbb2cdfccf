//! 应用层错误定义
//!
//! 每条流水线一个封闭的错误枚举，由调用方（命令路由）决定展示方式。
//! `user_message()` 给出面向用户的提示文本。

use thiserror::Error;

use crate::application::ports::{GatewayError, GenAiError, TtsError};

/// 语音连接错误
#[derive(Debug, Error)]
pub enum VoiceError {
    /// 调用者不在任何语音频道
    #[error("Caller is not in a voice channel")]
    NoVoiceChannel,

    /// bot 在该 guild 没有语音连接
    #[error("Not connected to a voice channel")]
    NotConnected,

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

impl VoiceError {
    pub fn user_message(&self) -> String {
        match self {
            VoiceError::NoVoiceChannel => "You need to be in a voice channel!".to_string(),
            VoiceError::NotConnected => "I'm not in a voice channel!".to_string(),
            VoiceError::Gateway(e) => format!("Voice connection error: {}", e),
        }
    }
}

/// TTS 流水线错误
#[derive(Debug, Error)]
pub enum TtsPipelineError {
    /// 音色目录尚未加载
    #[error("Voice catalog is empty")]
    CatalogEmpty,

    #[error("Voice not found: {0}")]
    VoiceNotFound(String),

    /// 提供方流结束但没有任何音频字节
    #[error("Provider returned no audio")]
    EmptyGenerationResult,

    #[error("Provider error: {0}")]
    Provider(#[from] TtsError),

    #[error(transparent)]
    Voice(#[from] VoiceError),
}

impl TtsPipelineError {
    pub fn user_message(&self) -> String {
        match self {
            TtsPipelineError::CatalogEmpty => "No voices loaded. Try again later.".to_string(),
            TtsPipelineError::VoiceNotFound(name) => format!(
                "Voice '{}' not found. Use `/voices` to see available voices.",
                name
            ),
            TtsPipelineError::EmptyGenerationResult => {
                "Error generating speech: the provider returned no audio".to_string()
            }
            TtsPipelineError::Provider(e) => format!("Error generating speech: {}", e),
            TtsPipelineError::Voice(e) => e.user_message(),
        }
    }
}

/// 对话流水线错误
#[derive(Debug, Error)]
pub enum ChatError {
    /// 去除提及后内容为空
    #[error("Empty prompt")]
    EmptyPrompt,

    #[error("Generative AI is not configured")]
    NotConfigured,

    #[error("Provider returned no text")]
    EmptyGenerationResult,

    #[error("Provider error: {0}")]
    Provider(#[from] GenAiError),
}

impl ChatError {
    pub fn user_message(&self) -> String {
        match self {
            ChatError::EmptyPrompt => {
                "Hey! Mention me with a question and I'll do my best to answer.".to_string()
            }
            ChatError::NotConfigured => "AI chat is not configured on this bot.".to_string(),
            ChatError::EmptyGenerationResult => {
                "Sorry, I couldn't generate a response.".to_string()
            }
            ChatError::Provider(e) => format!("Error generating response: {}", e),
        }
    }
}

/// 图像流水线错误
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Generative AI is not configured")]
    NotConfigured,

    /// 附件声明的 MIME 类型不是图片
    #[error("Invalid attachment type: {0}")]
    InvalidAttachment(String),

    #[error("No image produced")]
    NoImageProduced,

    #[error("Provider error: {0}")]
    Provider(#[from] GenAiError),
}

impl ImageError {
    pub fn user_message(&self) -> String {
        match self {
            ImageError::NotConfigured => {
                "Image generation is not configured on this bot.".to_string()
            }
            ImageError::InvalidAttachment(_) => "The attached file must be an image.".to_string(),
            ImageError::NoImageProduced => {
                "Sorry, I couldn't generate an image for that prompt.".to_string()
            }
            ImageError::Provider(e) => format!("Error generating image: {}", e),
        }
    }
}
