//! 消息文本处理
//!
//! - 去除 @bot 提及
//! - 按平台单条消息上限切分长文本
//! - 生成截断预览

/// 平台单条消息的硬上限（字符数）
pub const MESSAGE_LIMIT: usize = 2000;

/// 默认切片大小，小于硬上限以留出余量
pub const DEFAULT_CHUNK_SIZE: usize = 1900;

/// 去除所有指向 bot 的提及（`<@id>` 与 `<@!id>`），并去掉首尾空白
pub fn strip_mentions(text: &str, bot_user_id: u64) -> String {
    let plain = format!("<@{}>", bot_user_id);
    let nick = format!("<@!{}>", bot_user_id);
    text.replace(&nick, "").replace(&plain, "").trim().to_string()
}

/// 切分长文本
///
/// 未超过 `limit` 时原样返回单个切片；否则按 `chunk_size` 个字符连续切分。
/// 按字符计数，切片按顺序拼接后与原文完全一致。
pub fn split_message(text: &str, chunk_size: usize, limit: usize) -> Vec<String> {
    if text.chars().count() <= limit || chunk_size == 0 {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;
    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == chunk_size {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// 截取前 `max_chars` 个字符，被截断时追加 `...`
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_mentions_both_forms() {
        assert_eq!(strip_mentions("<@42> hello there", 42), "hello there");
        assert_eq!(strip_mentions("hi <@!42> and <@42>", 42), "hi  and");
        assert_eq!(strip_mentions("  <@42>  ", 42), "");
    }

    #[test]
    fn test_strip_mentions_keeps_other_users() {
        assert_eq!(strip_mentions("<@42> ask <@7>", 42), "ask <@7>");
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let text = "a".repeat(MESSAGE_LIMIT);
        let chunks = split_message(&text, DEFAULT_CHUNK_SIZE, MESSAGE_LIMIT);
        assert_eq!(chunks, vec![text]);
    }

    #[test]
    fn test_long_text_splits_in_order() {
        let text: String = (0..4500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = split_message(&text, DEFAULT_CHUNK_SIZE, MESSAGE_LIMIT);

        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= DEFAULT_CHUNK_SIZE));
        assert_eq!(chunks[2].chars().count(), 4500 - 2 * DEFAULT_CHUNK_SIZE);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_split_counts_chars_not_bytes() {
        let text = "语音".repeat(1100);
        let chunks = split_message(&text, DEFAULT_CHUNK_SIZE, MESSAGE_LIMIT);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), DEFAULT_CHUNK_SIZE);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_truncate_preview() {
        assert_eq!(truncate_preview("short", 100), "short");
        assert_eq!(truncate_preview("abcdef", 3), "abc...");
        assert_eq!(truncate_preview("abc", 3), "abc");
    }
}
