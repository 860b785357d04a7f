//! Chat channels and messages, with the cursor bookkeeping for paging.
//!
//! Channels page backwards by `updated_at` and are shown newest first.
//! Messages page backwards by `created_at` and are shown oldest first.
//! Pages can overlap at the cursor, so merging drops ids already present.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::timestamp_key;
use super::user::UserMetadata;

/// A conversation between two users.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatChannel {
    /// Channel id
    pub id: String,
    /// Preview of the latest message
    pub last_message_content: Option<String>,
    /// Time of the latest message
    pub last_message_at: Option<String>,
    /// Last change; the paging cursor
    pub updated_at: String,
}

/// The user on the other side of a channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtherUser {
    /// User id, when the server includes it
    pub id: Option<String>,
    /// Username
    pub username: String,
    /// Profile data (only `bio` is usually present)
    pub metadata: UserMetadata,
}

/// Channel plus its counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelWithUser {
    /// The channel
    pub chat_channel: ChatChannel,
    /// The other participant
    pub other_user: OtherUser,
}

/// One page of the channel list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelPage {
    /// Channels on this page
    pub chat_channel_other_user_pairs: Vec<ChannelWithUser>,
    /// Whether older channels exist
    pub has_more: bool,
}

impl ChannelPage {
    /// Order channels newest first.
    pub fn sort(&mut self) {
        self.chat_channel_other_user_pairs.sort_by(|a, b| {
            timestamp_key(&b.chat_channel.updated_at).cmp(&timestamp_key(&a.chat_channel.updated_at))
        });
    }

    /// Cursor for the next page: the oldest `updated_at` on this one.
    pub fn next_cursor(&self) -> Option<&str> {
        self.chat_channel_other_user_pairs
            .iter()
            .map(|pair| pair.chat_channel.updated_at.as_str())
            .min_by(|a, b| timestamp_key(a).cmp(&timestamp_key(b)))
    }

    /// Sort this page and append its channels to `list`, skipping ids
    /// already present. Returns how many were added.
    pub fn merge_into(mut self, list: &mut Vec<ChannelWithUser>) -> usize {
        self.sort();
        let seen: HashSet<String> = list.iter().map(|p| p.chat_channel.id.clone()).collect();
        let before = list.len();
        list.extend(
            self.chat_channel_other_user_pairs
                .into_iter()
                .filter(|pair| !seen.contains(&pair.chat_channel.id)),
        );
        list.len() - before
    }
}

/// Media attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ChatMessageMetadata {
    pub image_view_url: Option<String>,
    pub video_view_url: Option<String>,
    pub video_thumbnail_view_url: Option<String>,
    pub blob_height: Option<u32>,
    pub blob_width: Option<u32>,
    pub is_view_once: Option<bool>,
    pub is_view_once_viewed: Option<bool>,
}

/// A single chat message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatMessage {
    /// Message id
    pub id: String,
    /// Channel the message belongs to
    pub chat_channel_id: String,
    /// Sender
    pub src_user_id: String,
    /// Recipient
    pub dst_user_id: String,
    /// Text body
    pub content: Option<String>,
    /// Attached video blob
    pub video_id: Option<String>,
    /// Attached image blob
    pub image_id: Option<String>,
    /// Reaction by the first participant
    pub user_id_1_emoji: Option<String>,
    /// Reaction by the second participant
    pub user_id_2_emoji: Option<String>,
    /// Media details
    pub metadata: Option<ChatMessageMetadata>,
    /// Whether the sender deleted it
    pub deleted: bool,
    /// Send time; the paging cursor
    pub created_at: String,
    /// Last change
    pub updated_at: String,
}

impl ChatMessage {
    /// Short description for listings: the text, or the kind of attachment.
    pub fn summary(&self) -> &str {
        if self.deleted {
            return "[deleted]";
        }
        match (&self.content, &self.image_id, &self.video_id) {
            (Some(text), _, _) if !text.is_empty() => text.as_str(),
            (_, Some(_), _) => "[image]",
            (_, _, Some(_)) => "[video]",
            _ => "",
        }
    }
}

/// One page of a channel's history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagePage {
    /// Messages on this page
    pub chat_messages: Vec<ChatMessage>,
    /// Whether older messages exist
    pub has_more: bool,
}

impl MessagePage {
    /// Order messages oldest first.
    pub fn sort(&mut self) {
        self.chat_messages
            .sort_by(|a, b| timestamp_key(&a.created_at).cmp(&timestamp_key(&b.created_at)));
    }

    /// Cursor for the next (older) page: the oldest `created_at` on this one.
    pub fn next_cursor(&self) -> Option<&str> {
        self.chat_messages
            .iter()
            .map(|message| message.created_at.as_str())
            .min_by(|a, b| timestamp_key(a).cmp(&timestamp_key(b)))
    }

    /// Sort this page and put its messages in front of `history`, skipping
    /// ids already present. Returns how many were added.
    pub fn merge_into(mut self, history: &mut Vec<ChatMessage>) -> usize {
        self.sort();
        let seen: HashSet<String> = history.iter().map(|m| m.id.clone()).collect();
        let older: Vec<ChatMessage> = self
            .chat_messages
            .into_iter()
            .filter(|message| !seen.contains(&message.id))
            .collect();
        let added = older.len();
        history.splice(0..0, older);
        added
    }
}
