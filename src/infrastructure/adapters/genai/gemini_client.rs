//! Gemini Client - 调用 Gemini 流式生成 API
//!
//! 实现 GenAiPort trait
//!
//! 外部 API:
//! POST {base}/models/{model}:streamGenerateContent?alt=sse
//!      Request: {"contents": [...], "generationConfig": {...}, "safetySettings": [...]}
//!      Response: text/event-stream，每个事件的 data 为一个 GenerateContentResponse JSON
//! 认证: `x-goog-api-key` 请求头

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use super::sse::SseDecoder;
use crate::application::ports::{
    ContentPart, GenAiError, GenAiPort, GenerationChunk, GenerationRequest, GenerationStream,
    InlinePayload, Modality, SafetySetting,
};

const API_KEY_HEADER: &str = "x-goog-api-key";

// ============================================================================
// 请求体
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<ContentRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfigRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct ContentRecord {
    role: &'static str,
    parts: Vec<PartRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PartRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineDataRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataRecord {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfigRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfigRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    response_modalities: Vec<Modality>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfigRecord {
    thinking_budget: i32,
}

impl GenerateContentRequest {
    fn from_request(request: &GenerationRequest) -> Self {
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => PartRecord {
                    text: Some(text.clone()),
                    inline_data: None,
                },
                ContentPart::InlineData { mime_type, data } => PartRecord {
                    text: None,
                    inline_data: Some(InlineDataRecord {
                        mime_type: mime_type.clone(),
                        data: STANDARD.encode(data),
                    }),
                },
            })
            .collect();

        let config = &request.config;
        let generation_config =
            if config.thinking_budget.is_none() && config.response_modalities.is_empty() {
                None
            } else {
                Some(GenerationConfigRecord {
                    thinking_config: config
                        .thinking_budget
                        .map(|thinking_budget| ThinkingConfigRecord { thinking_budget }),
                    response_modalities: config.response_modalities.clone(),
                })
            };

        Self {
            contents: vec![ContentRecord {
                role: "user",
                parts,
            }],
            generation_config,
            safety_settings: config.safety_settings.clone(),
        }
    }
}

// ============================================================================
// 响应体（在此边界校验为强类型）
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<CandidateRecord>,
}

#[derive(Debug, Deserialize)]
struct CandidateRecord {
    #[serde(default)]
    content: Option<ResponseContentRecord>,
}

#[derive(Debug, Deserialize)]
struct ResponseContentRecord {
    #[serde(default)]
    parts: Vec<ResponsePartRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePartRecord {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<ResponseInlineData>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseInlineData {
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

/// 将一个 SSE 事件解析为 GenerationChunk
///
/// 文本片段按顺序拼接；内联数据取第一个
fn parse_event(data: &str) -> Result<GenerationChunk, GenAiError> {
    let response: GenerateContentResponse = serde_json::from_str(data)
        .map_err(|e| GenAiError::InvalidResponse(format!("Malformed stream event: {}", e)))?;

    let mut chunk = GenerationChunk::default();
    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    for part in parts.into_iter().filter(|p| !p.thought) {
        if let Some(text) = part.text {
            chunk.text.get_or_insert_with(String::new).push_str(&text);
        }
        if chunk.inline_data.is_none() {
            if let Some(inline) = part.inline_data {
                let data = STANDARD.decode(inline.data.as_bytes()).map_err(|e| {
                    GenAiError::InvalidResponse(format!("Invalid inline data: {}", e))
                })?;
                chunk.inline_data = Some(InlinePayload {
                    mime_type: inline.mime_type,
                    data: Bytes::from(data),
                });
            }
        }
    }
    Ok(chunk)
}

// ============================================================================
// 客户端
// ============================================================================

/// Gemini 客户端配置
#[derive(Debug, Clone)]
pub struct GeminiClientConfig {
    pub base_url: String,
    pub api_key: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for GeminiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: String::new(),
            timeout_secs: 120,
        }
    }
}

impl GeminiClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Gemini 客户端
pub struct GeminiClient {
    client: Client,
    config: GeminiClientConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiClientConfig) -> Result<Self, GenAiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenAiError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn stream_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }
}

fn map_request_error(e: reqwest::Error) -> GenAiError {
    if e.is_timeout() {
        GenAiError::Timeout
    } else if e.is_connect() {
        GenAiError::NetworkError(format!("Cannot connect to generative AI service: {}", e))
    } else {
        GenAiError::NetworkError(e.to_string())
    }
}

/// SSE 解码状态
struct EventStreamState {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
}

fn decode_event_stream(body: BoxStream<'static, reqwest::Result<Bytes>>) -> GenerationStream {
    let state = EventStreamState {
        body,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(data) = state.pending.pop_front() {
                return Some((parse_event(&data), state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(bytes)) => {
                    let events = state.decoder.push(&bytes);
                    state.pending.extend(events);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(map_request_error(e)), state));
                }
                None => {
                    state.finished = true;
                    let events = state.decoder.finish();
                    state.pending.extend(events);
                }
            }
        }
    })
    .boxed()
}

#[async_trait]
impl GenAiPort for GeminiClient {
    async fn stream_generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationStream, GenAiError> {
        let url = self.stream_url(&request.model);
        let body = GenerateContentRequest::from_request(&request);

        tracing::debug!(
            url = %url,
            parts = request.parts.len(),
            modalities = ?request.config.response_modalities,
            thinking_budget = ?request.config.thinking_budget,
            "Sending generation stream request"
        );

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenAiError::ServiceError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        Ok(decode_event_stream(response.bytes_stream().boxed()))
    }
}
