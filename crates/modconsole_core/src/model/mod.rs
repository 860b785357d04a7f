//! Types exchanged with the admin API.
//!
//! Field names follow the wire format. Timestamps stay as the strings the
//! server sent; [`parse_timestamp`] turns them into `chrono` values where
//! ordering matters.

use chrono::{DateTime, NaiveDateTime, Utc};

mod chat;
mod task;
mod user;
mod video;

pub use chat::{ChannelPage, ChannelWithUser, ChatChannel, ChatMessage, ChatMessageMetadata, MessagePage, OtherUser};
pub use task::{QueueType, Task, TaskCount, TaskCountsResponse, TaskStatus};
pub use user::{ImageDetails, ProfileField, User, UserMetadata, format_height};
pub use video::{Rotation, VideoEdit};

/// Parse a server timestamp.
///
/// Accepts RFC 3339 and, for servers that omit the offset, a naive
/// `YYYY-MM-DDTHH:MM:SS[.f]` interpreted as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Ordering key for a timestamp string: parsed time first, raw text as a
/// tiebreaker (and as the only key when parsing fails).
pub(crate) fn timestamp_key(raw: &str) -> (Option<DateTime<Utc>>, &str) {
    (parse_timestamp(raw), raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-05-01T12:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T14:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T12:30:00.000"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
