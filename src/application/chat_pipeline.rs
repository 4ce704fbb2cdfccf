//! Chat Pipeline - @提及 -> 流式文本生成 -> 按消息上限切分
//!
//! 第一段作为对触发消息的回复发送，其余段按顺序作为普通消息发送

use futures_util::StreamExt;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::application::error::ChatError;
use crate::application::ports::{
    ContentPart, GenAiPort, GenerationConfig, GenerationRequest, MessageSinkPort, SinkError,
};
use crate::domain::message::{split_message, strip_mentions, DEFAULT_CHUNK_SIZE, MESSAGE_LIMIT};

/// 对话流水线配置
#[derive(Debug, Clone)]
pub struct ChatPipelineConfig {
    pub model: String,
    /// 思考 token 预算
    pub thinking_budget: i32,
    /// 切片大小，必须小于 `message_limit`
    pub chunk_size: usize,
    pub message_limit: usize,
    /// bot 自身的用户 ID，用于去除提及
    pub bot_user_id: Option<u64>,
}

impl Default for ChatPipelineConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            thinking_budget: 1024,
            chunk_size: DEFAULT_CHUNK_SIZE,
            message_limit: MESSAGE_LIMIT,
            bot_user_id: None,
        }
    }
}

/// 对话流水线
pub struct ChatPipeline {
    genai: Option<Arc<dyn GenAiPort>>,
    config: ChatPipelineConfig,
}

impl ChatPipeline {
    pub fn new(genai: Option<Arc<dyn GenAiPort>>, config: ChatPipelineConfig) -> Self {
        Self { genai, config }
    }

    pub fn is_configured(&self) -> bool {
        self.genai.is_some()
    }

    fn prompt_from(&self, mention_text: &str) -> String {
        match self.config.bot_user_id {
            Some(id) => strip_mentions(mention_text, id),
            None => mention_text.trim().to_string(),
        }
    }

    /// 生成回复切片
    pub async fn try_respond(&self, mention_text: &str) -> Result<Vec<String>, ChatError> {
        let prompt = self.prompt_from(mention_text);
        if prompt.is_empty() {
            return Err(ChatError::EmptyPrompt);
        }
        let genai = self.genai.as_ref().ok_or(ChatError::NotConfigured)?;

        let request = GenerationRequest {
            model: self.config.model.clone(),
            parts: vec![ContentPart::Text(prompt)],
            config: GenerationConfig {
                thinking_budget: Some(self.config.thinking_budget),
                ..Default::default()
            },
        };
        let mut stream = genai.stream_generate(request).await?;

        let mut response = String::new();
        while let Some(chunk) = stream.next().await {
            if let Some(text) = chunk?.text {
                response.push_str(&text);
            }
        }
        if response.trim().is_empty() {
            return Err(ChatError::EmptyGenerationResult);
        }

        let chunks = split_message(&response, self.config.chunk_size, self.config.message_limit);
        tracing::info!(
            response_len = response.chars().count(),
            chunks = chunks.len(),
            "Chat response generated"
        );
        Ok(chunks)
    }

    /// 生成回复切片；错误转换为单条用户可见提示
    pub async fn respond(&self, mention_text: &str) -> Vec<String> {
        match self.try_respond(mention_text).await {
            Ok(chunks) => chunks,
            Err(e) => {
                match &e {
                    ChatError::Provider(inner) => {
                        tracing::warn!(error = %inner, "Chat generation failed")
                    }
                    other => tracing::debug!(reason = %other, "Chat request not served"),
                }
                vec![e.user_message()]
            }
        }
    }

    /// 按顺序发送切片：第一段回复触发消息，其余段普通发送
    pub async fn deliver(
        &self,
        chunks: &[String],
        sink: &dyn MessageSinkPort,
    ) -> Result<(), SinkError> {
        let mut iter = chunks.iter();
        if let Some(first) = iter.next() {
            sink.reply(first).await?;
        }
        for chunk in iter {
            sink.send(chunk).await?;
        }
        Ok(())
    }

    /// 后台处理一次提及，不提供取消
    pub fn spawn_reply(
        self: &Arc<Self>,
        mention_text: String,
        sink: Arc<dyn MessageSinkPort>,
    ) -> JoinHandle<()> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            let chunks = pipeline.respond(&mention_text).await;
            if let Err(e) = pipeline.deliver(&chunks, sink.as_ref()).await {
                tracing::error!(error = %e, "Failed to deliver chat reply");
            }
        })
    }
}
