//! Discord REST delivery for fired reminders.

use async_trait::async_trait;
use owl_scheduler::{Notifier, NotifyError};
use serde_json::json;

const API_BASE: &str = "https://discord.com/api/v10";

/// Discord rejects message content longer than 2000 characters.
const MESSAGE_CHAR_LIMIT: usize = 2000;

/// Break `text` into pieces Discord will accept.
///
/// The limit is counted in characters and every cut lands on a char boundary,
/// so emoji and CJK content never split mid-character. Cuts prefer the last
/// newline inside the window, then the last space, and only fall inside a
/// word when a single unbroken run exceeds the limit.
fn split_message(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = text;
    loop {
        // Byte offset of the first char past the limit, if any.
        let Some((overflow, _)) = rest.char_indices().nth(MESSAGE_CHAR_LIMIT) else {
            if !rest.is_empty() {
                pieces.push(rest.to_string());
            }
            return pieces;
        };
        let window = &rest[..overflow];
        let cut = match window.rfind('\n').or_else(|| window.rfind(' ')) {
            // A break at offset zero would emit an empty piece.
            Some(i) if i > 0 => i,
            _ => overflow,
        };
        pieces.push(rest[..cut].to_string());
        rest = rest[cut..].trim_start();
    }
}

/// Delivers reminder content through Discord's create-message endpoint.
pub struct DiscordNotifier {
    http: reqwest::Client,
    token: String,
}

impl DiscordNotifier {
    pub fn new(token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, channel_id: &str, content: &str) -> Result<(), NotifyError> {
        for piece in split_message(content) {
            let response = self
                .http
                .post(format!("{API_BASE}/channels/{channel_id}/messages"))
                .header("Authorization", format!("Bot {}", self.token))
                .json(&json!({ "content": piece }))
                .send()
                .await
                .map_err(|e| NotifyError::SendFailed(e.to_string()))?;

            if !response.status().is_success() {
                return Err(NotifyError::SendFailed(format!(
                    "Discord returned {} for channel {channel_id}",
                    response.status()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn char_len(s: &str) -> usize {
        s.chars().count()
    }

    #[test]
    fn short_message_passes_through_whole() {
        let pieces = split_message("**standup**\ntime for standup");
        assert_eq!(pieces, vec!["**standup**\ntime for standup"]);
    }

    #[test]
    fn exactly_at_the_limit_stays_whole() {
        let text = "a".repeat(MESSAGE_CHAR_LIMIT);
        assert_eq!(split_message(&text).len(), 1);
    }

    #[test]
    fn prefers_newline_breaks() {
        let line = "a".repeat(1200);
        let text = format!("{line}\n{line}");
        let pieces = split_message(&text);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0], line);
        assert_eq!(pieces[1], line);
    }

    #[test]
    fn unbroken_run_is_cut_at_the_limit() {
        let text = "x".repeat(MESSAGE_CHAR_LIMIT * 2 + 10);
        let pieces = split_message(&text);
        assert_eq!(pieces.len(), 3);
        for p in &pieces {
            assert!(char_len(p) <= MESSAGE_CHAR_LIMIT);
        }
    }

    #[test]
    fn multibyte_content_splits_without_panicking() {
        // Four bytes per char: any byte-indexed cut would land mid-character.
        let text = "🦉".repeat(MESSAGE_CHAR_LIMIT + 500);
        let pieces = split_message(&text);
        assert!(pieces.len() >= 2);
        for p in &pieces {
            assert!(char_len(p) <= MESSAGE_CHAR_LIMIT);
        }
        assert_eq!(pieces.concat(), text);
    }

    #[test]
    fn mixed_multibyte_prose_respects_word_breaks() {
        let word = "予定リマインダー🦉";
        let text = std::iter::repeat(word)
            .take(400)
            .collect::<Vec<_>>()
            .join(" ");
        let pieces = split_message(&text);
        assert!(pieces.len() >= 2);
        for p in &pieces {
            assert!(char_len(p) <= MESSAGE_CHAR_LIMIT);
            // Space breaks were available, so every piece starts on a word.
            assert!(p.starts_with('予'));
            assert!(p.ends_with('🦉'));
        }
    }
}
