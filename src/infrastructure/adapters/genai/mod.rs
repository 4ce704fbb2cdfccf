//! GenAI Adapter - 生成式 AI 提供方实现

mod gemini_client;
mod scripted_genai_client;
mod sse;

pub use gemini_client::{GeminiClient, GeminiClientConfig};
pub use scripted_genai_client::{ScriptStep, ScriptedGenAiClient};
