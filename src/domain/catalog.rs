//! Voice Catalog Snapshot - 音色名称到音色 ID 的不可变快照
//!
//! 快照一经构建不再修改，刷新时整体替换

use std::collections::HashMap;

/// 自动补全最多返回的候选数量
pub const MAX_SUGGESTIONS: usize = 25;

/// 音色条目（名称 -> 提供方音色 ID）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceEntry {
    pub name: String,
    pub voice_id: String,
}

impl VoiceEntry {
    pub fn new(name: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            voice_id: voice_id.into(),
        }
    }
}

/// 音色目录快照
///
/// 不变量:
/// - 名称唯一（大小写敏感）
/// - 迭代顺序为名称首次出现的顺序
#[derive(Debug, Clone, Default)]
pub struct VoiceSnapshot {
    entries: Vec<VoiceEntry>,
    index: HashMap<String, usize>,
}

impl VoiceSnapshot {
    /// 从提供方返回的音色列表构建快照
    ///
    /// 重名音色保留首次出现的位置，ID 取最后一次出现的值
    pub fn from_entries(voices: impl IntoIterator<Item = VoiceEntry>) -> Self {
        let mut snapshot = Self::default();
        for voice in voices {
            match snapshot.index.get(&voice.name) {
                Some(&pos) => snapshot.entries[pos].voice_id = voice.voice_id,
                None => {
                    snapshot.index.insert(voice.name.clone(), snapshot.entries.len());
                    snapshot.entries.push(voice);
                }
            }
        }
        snapshot
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 精确匹配名称
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.index
            .get(name)
            .map(|&pos| self.entries[pos].voice_id.as_str())
    }

    /// 不区分大小写的子串过滤，按目录顺序返回，最多 25 个
    pub fn suggest(&self, fragment: &str) -> Vec<String> {
        let needle = fragment.to_lowercase();
        self.entries
            .iter()
            .filter(|e| e.name.to_lowercase().contains(&needle))
            .take(MAX_SUGGESTIONS)
            .map(|e| e.name.clone())
            .collect()
    }

    /// 排序后的全部名称（列表视图）
    pub fn sorted_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.name.clone()).collect();
        names.sort();
        names
    }

    pub fn entries(&self) -> &[VoiceEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VoiceSnapshot {
        VoiceSnapshot::from_entries(vec![
            VoiceEntry::new("Rachel", "id-rachel"),
            VoiceEntry::new("Adam", "id-adam"),
            VoiceEntry::new("Rachael Deep", "id-deep"),
            VoiceEntry::new("Bella", "id-bella"),
        ])
    }

    #[test]
    fn test_resolve_is_exact_and_case_sensitive() {
        let snapshot = sample();
        assert_eq!(snapshot.resolve("Rachel"), Some("id-rachel"));
        assert_eq!(snapshot.resolve("rachel"), None);
        assert_eq!(snapshot.resolve("Unknown Voice"), None);
    }

    #[test]
    fn test_suggest_filters_case_insensitively_in_catalog_order() {
        let snapshot = sample();
        assert_eq!(snapshot.suggest("RACH"), vec!["Rachel", "Rachael Deep"]);
        assert_eq!(snapshot.suggest("a").len(), 4);
        assert!(snapshot.suggest("zzz").is_empty());
    }

    #[test]
    fn test_suggest_caps_at_25() {
        let snapshot = VoiceSnapshot::from_entries(
            (0..40).map(|i| VoiceEntry::new(format!("Voice {i}"), format!("id-{i}"))),
        );
        let suggestions = snapshot.suggest("voice");
        assert_eq!(suggestions.len(), MAX_SUGGESTIONS);
        assert_eq!(suggestions[0], "Voice 0");
        assert!(suggestions.iter().all(|n| n.to_lowercase().contains("voice")));
    }

    #[test]
    fn test_duplicate_names_keep_single_key() {
        let snapshot = VoiceSnapshot::from_entries(vec![
            VoiceEntry::new("Adam", "old"),
            VoiceEntry::new("Bella", "id-bella"),
            VoiceEntry::new("Adam", "new"),
        ]);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.resolve("Adam"), Some("new"));
        assert_eq!(snapshot.entries()[0].name, "Adam");
    }

    #[test]
    fn test_sorted_names() {
        assert_eq!(
            sample().sorted_names(),
            vec!["Adam", "Bella", "Rachael Deep", "Rachel"]
        );
    }
}
