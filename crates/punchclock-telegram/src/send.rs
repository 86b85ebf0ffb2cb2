//! Outbound text for Telegram.
//!
//! Telegram rejects messages over 4096 characters; chunks stay at 4090.
//! All replies go out as plain text.

use std::time::Duration;

use teloxide::prelude::*;

use crate::error::TelegramError;

const CHUNK_MAX: usize = 4090;

/// Pause between consecutive chunks of one reply.
const CHUNK_DELAY: Duration = Duration::from_millis(100);

/// Split `text` on line boundaries into chunks of at most [`CHUNK_MAX`]
/// characters. A single oversized line is cut at the last space that fits,
/// or hard at the limit.
pub fn split_chunks(text: &str) -> Vec<String> {
    if text.chars().count() <= CHUNK_MAX {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        let cost = if current.is_empty() { line_len } else { line_len + 1 };

        if !current.is_empty() && current_len + cost > CHUNK_MAX {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len > CHUNK_MAX {
            let mut pieces = split_long_line(line);
            if let Some(last) = pieces.pop() {
                chunks.extend(pieces);
                current_len = last.chars().count();
                current = last;
            }
            continue;
        }

        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn split_long_line(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = line;
    while rest.chars().count() > CHUNK_MAX {
        let limit = rest
            .char_indices()
            .nth(CHUNK_MAX)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let cut = match rest[..limit].rfind(' ') {
            Some(i) if i > 0 => i,
            _ => limit,
        };
        out.push(rest[..cut].to_string());
        rest = rest[cut..].trim_start();
    }
    if !rest.is_empty() {
        out.push(rest.to_string());
    }
    out
}

/// Send `text` to `chat_id`, chunked. Stops at the first failed chunk.
pub async fn send_text(bot: &Bot, chat_id: &str, text: &str) -> Result<(), TelegramError> {
    let id: i64 = chat_id
        .parse()
        .map_err(|_| TelegramError::InvalidChatId(chat_id.to_string()))?;

    let chunks = split_chunks(text);
    for (i, chunk) in chunks.iter().enumerate() {
        bot.send_message(ChatId(id), chunk).await?;
        if i + 1 < chunks.len() {
            tokio::time::sleep(CHUNK_DELAY).await;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_chunks("✅ Checked in"), vec!["✅ Checked in".to_string()]);
    }

    #[test]
    fn limit_is_counted_in_characters() {
        // 4090 multi-byte characters still fit in one message.
        let text = "é".repeat(CHUNK_MAX);
        assert_eq!(split_chunks(&text).len(), 1);
    }

    #[test]
    fn splits_between_lines() {
        let line = "a".repeat(3000);
        let text = format!("{line}\n{line}\n{line}");
        let chunks = split_chunks(&text);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c == &line));
    }

    #[test]
    fn oversized_line_is_cut() {
        let text = "x".repeat(9000);
        let chunks = split_chunks(&text);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= CHUNK_MAX));
        assert_eq!(chunks.concat().len(), 9000);
    }

    #[test]
    fn oversized_line_prefers_spaces() {
        let word = "word ";
        let text = word.repeat(1000);
        let chunks = split_chunks(text.trim_end());
        assert!(chunks.len() >= 2);
        assert!(chunks.iter().all(|c| !c.starts_with(' ') && !c.ends_with(' ')));
    }
}
