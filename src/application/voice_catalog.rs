//! Voice Catalog - 音色目录缓存
//!
//! 启动时从 TTS 提供方加载一次。加载是全有或全无的：
//! 失败时保留原有快照（初始为空）

use parking_lot::RwLock;
use std::sync::Arc;

use crate::application::ports::{TtsEnginePort, TtsError};
use crate::domain::{VoiceEntry, VoiceSnapshot};

/// 音色目录
pub struct VoiceCatalog {
    snapshot: RwLock<Arc<VoiceSnapshot>>,
}

impl VoiceCatalog {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(VoiceSnapshot::default())),
        }
    }

    pub fn from_entries(voices: impl IntoIterator<Item = VoiceEntry>) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(VoiceSnapshot::from_entries(voices))),
        }
    }

    /// 从提供方加载全部音色并整体替换快照
    ///
    /// 失败时快照保持不变，错误仅用于诊断
    pub async fn load(&self, engine: &dyn TtsEnginePort) -> Result<usize, TtsError> {
        match engine.list_voices().await {
            Ok(voices) => {
                let snapshot = Arc::new(VoiceSnapshot::from_entries(voices));
                let count = snapshot.len();
                *self.snapshot.write() = snapshot;
                tracing::info!(count = count, "Loaded voices from TTS provider");
                Ok(count)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    retained = self.len(),
                    "Failed to load voices, keeping previous catalog"
                );
                Err(e)
            }
        }
    }

    /// 当前快照（读取期间不受并发刷新影响）
    pub fn snapshot(&self) -> Arc<VoiceSnapshot> {
        self.snapshot.read().clone()
    }

    pub fn resolve(&self, name: &str) -> Option<String> {
        self.snapshot().resolve(name).map(str::to_string)
    }

    pub fn suggest(&self, fragment: &str) -> Vec<String> {
        self.snapshot().suggest(fragment)
    }

    pub fn sorted_names(&self) -> Vec<String> {
        self.snapshot().sorted_names()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

impl Default for VoiceCatalog {
    fn default() -> Self {
        Self::new()
    }
}
