//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod genai;
pub mod tts;

pub use genai::*;
pub use tts::*;
