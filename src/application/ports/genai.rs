//! Generative AI Port - 生成式 AI 提供方抽象
//!
//! 请求由结构化内容片段组成，响应为流式 chunk，每个 chunk 可携带文本和/或内联二进制数据

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use serde::Serialize;
use thiserror::Error;

/// 生成式 AI 错误
#[derive(Debug, Error)]
pub enum GenAiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// 内联二进制数据（带 MIME 类型）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinePayload {
    pub mime_type: Option<String>,
    pub data: Bytes,
}

/// 请求内容片段
#[derive(Debug, Clone)]
pub enum ContentPart {
    Text(String),
    InlineData { mime_type: String, data: Bytes },
}

/// 输出模态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    Text,
    Image,
}

/// 安全类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
}

impl HarmCategory {
    pub const ALL: [HarmCategory; 4] = [
        HarmCategory::Harassment,
        HarmCategory::HateSpeech,
        HarmCategory::SexuallyExplicit,
        HarmCategory::DangerousContent,
    ];
}

/// 安全阈值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmThreshold {
    BlockNone,
    BlockOnlyHigh,
    BlockMediumAndAbove,
    BlockLowAndAbove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmThreshold,
}

/// 生成配置
#[derive(Debug, Clone, Default)]
pub struct GenerationConfig {
    /// 思考 token 预算
    pub thinking_budget: Option<i32>,
    /// 请求的输出模态，为空时由提供方决定
    pub response_modalities: Vec<Modality>,
    pub safety_settings: Vec<SafetySetting>,
}

impl GenerationConfig {
    /// 所有类别都放宽到 `BLOCK_NONE`
    pub fn relaxed_safety() -> Vec<SafetySetting> {
        HarmCategory::ALL
            .iter()
            .map(|&category| SafetySetting {
                category,
                threshold: HarmThreshold::BlockNone,
            })
            .collect()
    }
}

/// 生成请求
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub parts: Vec<ContentPart>,
    pub config: GenerationConfig,
}

/// 流式响应 chunk（已在适配器边界校验为强类型）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationChunk {
    pub text: Option<String>,
    pub inline_data: Option<InlinePayload>,
}

impl GenerationChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline(mime_type: Option<&str>, data: impl Into<Bytes>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlinePayload {
                mime_type: mime_type.map(str::to_string),
                data: data.into(),
            }),
        }
    }
}

/// 生成响应流
pub type GenerationStream = BoxStream<'static, Result<GenerationChunk, GenAiError>>;

/// Generative AI Port
#[async_trait]
pub trait GenAiPort: Send + Sync {
    /// 发起流式生成
    async fn stream_generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationStream, GenAiError>;
}
