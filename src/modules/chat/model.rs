use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::constants::{CHAT_MESSAGE_TTL_DAYS, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

pub const MAX_CHAT_MESSAGE_LENGTH: usize = 2000;

pub fn expiry_for(sent_at: chrono::DateTime<chrono::Utc>) -> chrono::DateTime<chrono::Utc> {
    sent_at + chrono::Duration::days(CHAT_MESSAGE_TTL_DAYS)
}

/// Trimmed content, or `None` when it is empty or too long.
pub fn normalize_content(content: &str) -> Option<&str> {
    let trimmed = content.trim();
    let len = trimmed.chars().count();
    (len > 0 && len <= MAX_CHAT_MESSAGE_LENGTH).then_some(trimmed)
}

pub enum ChatTarget {
    Room(Uuid),
    User(Uuid),
}

pub struct NewChatMessage {
    pub sender_id: Uuid,
    pub target: ChatTarget,
    pub content: String,
    pub sent_at: chrono::DateTime<chrono::Utc>,
}

impl NewChatMessage {
    pub fn expires_at(&self) -> chrono::DateTime<chrono::Utc> {
        expiry_for(self.sent_at)
    }
}

/// Newest-first page of history, optionally before a cursor.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChatHistoryQuery {
    pub before: Option<chrono::DateTime<chrono::Utc>>,
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i64>,
}

impl ChatHistoryQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_expire_after_three_days() {
        let sent = chrono::Utc::now();
        assert_eq!(expiry_for(sent) - sent, chrono::Duration::hours(72));
    }

    #[test]
    fn test_normalize_content() {
        assert_eq!(normalize_content("  gg  "), Some("gg"));
        assert_eq!(normalize_content("   "), None);
        assert_eq!(normalize_content(&"a".repeat(MAX_CHAT_MESSAGE_LENGTH + 1)), None);
    }
}
