//! Scripted GenAI Client - 用于测试的生成式 AI 客户端
//!
//! 按脚本依次返回 chunk，并记录请求与已被消费的 chunk 数

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::application::ports::{
    GenAiError, GenAiPort, GenerationChunk, GenerationRequest, GenerationStream,
};

/// 脚本中的一步
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Chunk(GenerationChunk),
    /// 流中途出错
    Fail(String),
}

pub struct ScriptedGenAiClient {
    steps: Vec<ScriptStep>,
    /// 请求阶段直接失败
    reject: Option<String>,
    requests: Mutex<Vec<GenerationRequest>>,
    consumed: Arc<AtomicUsize>,
}

impl ScriptedGenAiClient {
    pub fn new(chunks: Vec<GenerationChunk>) -> Self {
        Self::with_steps(chunks.into_iter().map(ScriptStep::Chunk).collect())
    }

    pub fn with_steps(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            reject: None,
            requests: Mutex::new(Vec::new()),
            consumed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 每次请求都返回 ServiceError
    pub fn rejecting(message: impl Into<String>) -> Self {
        let mut client = Self::with_steps(Vec::new());
        client.reject = Some(message.into());
        client
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }

    /// 调用方实际拉取过的 chunk 数
    pub fn consumed(&self) -> usize {
        self.consumed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenAiPort for ScriptedGenAiClient {
    async fn stream_generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationStream, GenAiError> {
        self.requests.lock().push(request);
        if let Some(message) = &self.reject {
            return Err(GenAiError::ServiceError(message.clone()));
        }

        let consumed = self.consumed.clone();
        let items = stream::iter(self.steps.clone()).map(move |step| {
            consumed.fetch_add(1, Ordering::SeqCst);
            match step {
                ScriptStep::Chunk(chunk) => Ok(chunk),
                ScriptStep::Fail(message) => Err(GenAiError::NetworkError(message)),
            }
        });
        Ok(items.boxed())
    }
}
