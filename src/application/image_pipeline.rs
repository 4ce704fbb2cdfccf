//! Image Pipeline - 提示词 (+ 可选参考图) -> 流式图像生成 -> 第一个内联图片

use bytes::Bytes;
use futures_util::StreamExt;
use std::sync::Arc;

use crate::application::error::ImageError;
use crate::application::ports::{
    ContentPart, FileAttachment, GenAiPort, GenerationConfig, GenerationRequest, MessageSinkPort,
    Modality, SinkError,
};
use crate::domain::media::{extension_for_mime, is_image_mime};

/// 图像流水线配置
#[derive(Debug, Clone)]
pub struct ImagePipelineConfig {
    pub model: String,
}

impl Default for ImagePipelineConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash-image".to_string(),
        }
    }
}

/// 调用者提供的参考图
#[derive(Debug, Clone)]
pub struct InputImage {
    pub data: Bytes,
    /// 附件声明的 MIME 类型
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub input: Option<InputImage>,
}

/// 生成的图片
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub data: Bytes,
    pub mime_type: Option<String>,
    pub extension: String,
    /// 图片之前模型输出的文字
    pub caption: Option<String>,
}

impl GeneratedImage {
    pub fn filename(&self) -> String {
        format!("generated.{}", self.extension)
    }

    pub fn to_attachment(&self) -> FileAttachment {
        FileAttachment {
            filename: self.filename(),
            description: None,
            data: self.data.clone(),
        }
    }
}

/// 图像流水线
pub struct ImagePipeline {
    genai: Option<Arc<dyn GenAiPort>>,
    config: ImagePipelineConfig,
}

impl ImagePipeline {
    pub fn new(genai: Option<Arc<dyn GenAiPort>>, config: ImagePipelineConfig) -> Self {
        Self { genai, config }
    }

    /// 生成图片
    ///
    /// 参考图的 MIME 类型在任何网络调用之前校验。
    /// 扫描到第一个携带非空内联数据的 chunk 即返回，不等待流结束。
    pub async fn imagine(&self, request: ImageRequest) -> Result<GeneratedImage, ImageError> {
        if let Some(input) = &request.input {
            let mime = input.mime_type.as_deref().unwrap_or("");
            if !is_image_mime(mime) {
                return Err(ImageError::InvalidAttachment(mime.to_string()));
            }
        }
        let genai = self.genai.as_ref().ok_or(ImageError::NotConfigured)?;

        let mut parts = Vec::with_capacity(2);
        if let Some(input) = request.input {
            parts.push(ContentPart::InlineData {
                mime_type: input.mime_type.unwrap_or_default(),
                data: input.data,
            });
        }
        parts.push(ContentPart::Text(request.prompt));

        let generation = GenerationRequest {
            model: self.config.model.clone(),
            parts,
            config: GenerationConfig {
                thinking_budget: None,
                response_modalities: vec![Modality::Image, Modality::Text],
                safety_settings: GenerationConfig::relaxed_safety(),
            },
        };
        let mut stream = genai.stream_generate(generation).await?;

        let mut caption = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if let Some(text) = chunk.text {
                caption.push_str(&text);
            }
            if let Some(inline) = chunk.inline_data.filter(|p| !p.data.is_empty()) {
                let extension = extension_for_mime(inline.mime_type.as_deref());
                tracing::info!(
                    mime_type = ?inline.mime_type,
                    size = inline.data.len(),
                    "Image generated"
                );
                let caption = caption.trim();
                return Ok(GeneratedImage {
                    data: inline.data,
                    mime_type: inline.mime_type,
                    extension,
                    caption: (!caption.is_empty()).then(|| caption.to_string()),
                });
            }
        }

        Err(ImageError::NoImageProduced)
    }

    /// 以附件形式发送生成的图片
    pub async fn deliver(
        &self,
        image: &GeneratedImage,
        sink: &dyn MessageSinkPort,
    ) -> Result<(), SinkError> {
        let content = image.caption.clone().unwrap_or_default();
        sink.send_file(&content, image.to_attachment()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{GenerationChunk, HarmThreshold};
    use crate::infrastructure::adapters::ScriptedGenAiClient;
    use crate::infrastructure::memory::{RecordingMessageSink, SentMessage};

    fn pipeline_with(client: Arc<ScriptedGenAiClient>) -> ImagePipeline {
        ImagePipeline::new(Some(client), ImagePipelineConfig::default())
    }

    fn prompt(text: &str) -> ImageRequest {
        ImageRequest {
            prompt: text.to_string(),
            input: None,
        }
    }

    #[tokio::test]
    async fn test_text_attachment_rejected_before_network() {
        let client = Arc::new(ScriptedGenAiClient::new(vec![GenerationChunk::inline(
            Some("image/png"),
            Bytes::from_static(b"png"),
        )]));
        let pipeline = pipeline_with(client.clone());

        let result = pipeline
            .imagine(ImageRequest {
                prompt: "make it blue".to_string(),
                input: Some(InputImage {
                    data: Bytes::from_static(b"hello"),
                    mime_type: Some("text/plain".to_string()),
                }),
            })
            .await;

        assert!(matches!(result, Err(ImageError::InvalidAttachment(ref m)) if m == "text/plain"));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_text_only_stream_produces_no_image() {
        let client = Arc::new(ScriptedGenAiClient::new(vec![
            GenerationChunk::text("I can't draw that"),
            GenerationChunk::inline(Some("image/png"), Bytes::new()),
        ]));
        let pipeline = pipeline_with(client.clone());

        let err = pipeline.imagine(prompt("a cat")).await.unwrap_err();
        assert!(matches!(err, ImageError::NoImageProduced));
        assert_eq!(
            err.user_message(),
            "Sorry, I couldn't generate an image for that prompt."
        );
        // 空的内联数据不算图片，整个流都被扫描
        assert_eq!(client.consumed(), 2);
    }

    #[tokio::test]
    async fn test_first_inline_payload_stops_scan() {
        let client = Arc::new(ScriptedGenAiClient::new(vec![
            GenerationChunk::text("Here you go."),
            GenerationChunk::inline(Some("image/jpeg"), Bytes::from_static(b"first")),
            GenerationChunk::inline(Some("image/png"), Bytes::from_static(b"second")),
            GenerationChunk::text("trailing"),
        ]));
        let pipeline = pipeline_with(client.clone());

        let image = pipeline.imagine(prompt("a cat")).await.unwrap();
        assert_eq!(image.data, Bytes::from_static(b"first"));
        assert_eq!(image.filename(), "generated.jpeg");
        assert_eq!(image.caption.as_deref(), Some("Here you go."));
        assert_eq!(client.consumed(), 2);

        let sink = RecordingMessageSink::new();
        pipeline.deliver(&image, &sink).await.unwrap();
        assert!(matches!(
            &sink.sent()[..],
            [SentMessage::File { file, .. }] if file.filename == "generated.jpeg"
        ));
    }

    #[tokio::test]
    async fn test_missing_mime_falls_back_to_png() {
        let client = Arc::new(ScriptedGenAiClient::new(vec![GenerationChunk::inline(
            None,
            Bytes::from_static(b"raw"),
        )]));
        let image = pipeline_with(client).imagine(prompt("x")).await.unwrap();
        assert_eq!(image.extension, "png");
        assert!(image.caption.is_none());
    }

    #[tokio::test]
    async fn test_request_puts_image_before_prompt_with_relaxed_safety() {
        let client = Arc::new(ScriptedGenAiClient::new(vec![GenerationChunk::inline(
            Some("image/png"),
            Bytes::from_static(b"out"),
        )]));
        let pipeline = pipeline_with(client.clone());

        pipeline
            .imagine(ImageRequest {
                prompt: "add a hat".to_string(),
                input: Some(InputImage {
                    data: Bytes::from_static(b"in"),
                    mime_type: Some("image/webp".to_string()),
                }),
            })
            .await
            .unwrap();

        let request = &client.requests()[0];
        assert!(matches!(
            &request.parts[..],
            [ContentPart::InlineData { mime_type, .. }, ContentPart::Text(t)]
                if mime_type == "image/webp" && t == "add a hat"
        ));
        assert_eq!(
            request.config.response_modalities,
            vec![Modality::Image, Modality::Text]
        );
        assert!(request
            .config
            .safety_settings
            .iter()
            .all(|s| s.threshold == HarmThreshold::BlockNone));
    }

    #[tokio::test]
    async fn test_not_configured() {
        let pipeline = ImagePipeline::new(None, ImagePipelineConfig::default());
        assert!(matches!(
            pipeline.imagine(prompt("x")).await,
            Err(ImageError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_provider_rejection() {
        let client = Arc::new(ScriptedGenAiClient::rejecting("HTTP 429: quota"));
        let result = pipeline_with(client).imagine(prompt("x")).await;
        assert!(matches!(result, Err(ImageError::Provider(_))));
    }
}
