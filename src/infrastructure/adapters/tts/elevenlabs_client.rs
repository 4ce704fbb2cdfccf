//! ElevenLabs TTS Client - 调用 ElevenLabs HTTP API
//!
//! 实现 TtsEnginePort trait
//!
//! 外部 TTS API:
//! GET  {base}/v1/voices
//!      Response: {"voices": [{"voice_id": "...", "name": "..."}]}
//! POST {base}/v1/text-to-speech/{voice_id}/stream?output_format=mp3_44100_128
//!      Request: {"text": "...", "model_id": "eleven_multilingual_v2"}  (JSON)
//!      Response: audio/mpeg chunked binary
//! 认证: `xi-api-key` 请求头

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::{AudioStream, SynthesisRequest, TtsEnginePort, TtsError};
use crate::domain::VoiceEntry;

const API_KEY_HEADER: &str = "xi-api-key";

/// 合成请求体 (JSON)
#[derive(Debug, Serialize)]
struct SpeechHttpRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

/// 音色列表响应
#[derive(Debug, Deserialize)]
struct VoicesHttpResponse {
    voices: Vec<VoiceRecord>,
}

#[derive(Debug, Deserialize)]
struct VoiceRecord {
    voice_id: String,
    name: String,
}

/// ElevenLabs 客户端配置
#[derive(Debug, Clone)]
pub struct ElevenLabsClientConfig {
    /// API 基础 URL
    pub base_url: String,
    pub api_key: String,
    /// 请求超时时间（秒），覆盖整个请求包括流式响应体
    pub timeout_secs: u64,
}

impl Default for ElevenLabsClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io".to_string(),
            api_key: String::new(),
            timeout_secs: 120,
        }
    }
}

impl ElevenLabsClientConfig {
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

/// ElevenLabs TTS 客户端
pub struct ElevenLabsClient {
    client: Client,
    config: ElevenLabsClientConfig,
}

impl ElevenLabsClient {
    pub fn new(config: ElevenLabsClientConfig) -> Result<Self, TtsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TtsError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn voices_url(&self) -> String {
        format!("{}/v1/voices", self.base())
    }

    fn stream_url(&self, voice_id: &str, output_format: &str) -> String {
        format!(
            "{}/v1/text-to-speech/{}/stream?output_format={}",
            self.base(),
            voice_id,
            output_format
        )
    }

    fn user_url(&self) -> String {
        format!("{}/v1/user", self.base())
    }
}

fn map_request_error(e: reqwest::Error) -> TtsError {
    if e.is_timeout() {
        TtsError::Timeout
    } else if e.is_connect() {
        TtsError::NetworkError(format!("Cannot connect to TTS service: {}", e))
    } else {
        TtsError::NetworkError(e.to_string())
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, TtsError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response.text().await.unwrap_or_default();
    Err(TtsError::ServiceError(format!(
        "HTTP {}: {}",
        status, error_text
    )))
}

#[async_trait]
impl TtsEnginePort for ElevenLabsClient {
    async fn list_voices(&self) -> Result<Vec<VoiceEntry>, TtsError> {
        tracing::debug!(url = %self.voices_url(), "Fetching voice list");

        let response = self
            .client
            .get(self.voices_url())
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await
            .map_err(map_request_error)?;
        let response = ensure_success(response).await?;

        let body: VoicesHttpResponse = response
            .json()
            .await
            .map_err(|e| TtsError::InvalidResponse(format!("Failed to parse voices: {}", e)))?;

        Ok(body
            .voices
            .into_iter()
            .map(|v| VoiceEntry::new(v.name, v.voice_id))
            .collect())
    }

    async fn synthesize_stream(&self, request: SynthesisRequest) -> Result<AudioStream, TtsError> {
        let url = self.stream_url(&request.voice_id, &request.output_format);
        tracing::debug!(
            url = %url,
            text_len = request.text.len(),
            model_id = %request.model_id,
            "Sending TTS stream request"
        );

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&SpeechHttpRequest {
                text: &request.text,
                model_id: &request.model_id,
            })
            .send()
            .await
            .map_err(map_request_error)?;
        let response = ensure_success(response).await?;

        let stream = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| {
                if e.is_timeout() {
                    TtsError::Timeout
                } else {
                    TtsError::InvalidResponse(format!("Failed to read audio: {}", e))
                }
            })
        });
        Ok(stream.boxed())
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.user_url())
            .header(API_KEY_HEADER, &self.config.api_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ElevenLabsClientConfig::default();
        assert_eq!(config.base_url, "https://api.elevenlabs.io");
        assert_eq!(config.timeout_secs, 120);
    }

    #[test]
    fn test_config_builder() {
        let config = ElevenLabsClientConfig::new("key")
            .with_base_url("http://localhost:9000/")
            .with_timeout(60);
        assert_eq!(config.api_key, "key");
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_urls_trim_trailing_slash() {
        let client = ElevenLabsClient::new(
            ElevenLabsClientConfig::new("key").with_base_url("http://localhost:9000/"),
        )
        .unwrap();
        assert_eq!(client.voices_url(), "http://localhost:9000/v1/voices");
        assert_eq!(
            client.stream_url("abc", "mp3_44100_128"),
            "http://localhost:9000/v1/text-to-speech/abc/stream?output_format=mp3_44100_128"
        );
    }

    #[test]
    fn test_parse_voices_response() {
        let json = r#"{"voices":[{"voice_id":"21m00","name":"Rachel","category":"premade"}]}"#;
        let body: VoicesHttpResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.voices.len(), 1);
        assert_eq!(body.voices[0].name, "Rachel");
        assert_eq!(body.voices[0].voice_id, "21m00");
    }
}
