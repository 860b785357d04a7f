//! Chat channel and message listings.
//!
//! Both listings page backwards with a timestamp cursor. With `--all` the
//! pages are merged the way a scrolling view would merge them.

use modconsole_core::api::AdminClient;
use modconsole_core::config::Config;
use modconsole_core::error::Result;
use modconsole_core::model::{ChannelWithUser, ChatMessage};

use crate::cli::args::ChatCommands;
use crate::cli::block_on;
use crate::cli::util::{admin_client, report};

/// Handle chat subcommands. Returns true on success.
pub fn handle_chat_command(config: &Config, command: ChatCommands) -> bool {
    let Some(client) = admin_client(config) else {
        return false;
    };

    let outcome = match command {
        ChatCommands::Channels {
            user_id,
            before,
            all,
        } => block_on(list_channels(&client, &user_id, before, all)),

        ChatCommands::Messages {
            channel_id,
            before,
            all,
        } => block_on(list_messages(&client, &channel_id, before, all)),
    };

    report(outcome)
}

async fn list_channels(
    client: &AdminClient,
    user_id: &str,
    before: Option<String>,
    all: bool,
) -> Result<()> {
    let mut channels: Vec<ChannelWithUser> = Vec::new();
    let mut cursor = before;
    loop {
        let page = client.chat_channels(user_id, cursor.as_deref()).await?;
        let has_more = page.has_more;
        let next = page.next_cursor().map(str::to_string);
        let added = page.merge_into(&mut channels);
        log::debug!("[Chats] Merged {} channels", added);
        if !all || !has_more || added == 0 || next.is_none() {
            print_channels(&channels, next.filter(|_| has_more));
            return Ok(());
        }
        cursor = next;
    }
}

async fn list_messages(
    client: &AdminClient,
    channel_id: &str,
    before: Option<String>,
    all: bool,
) -> Result<()> {
    let mut history: Vec<ChatMessage> = Vec::new();
    let mut cursor = before;
    loop {
        let page = client.chat_messages(channel_id, cursor.as_deref()).await?;
        let has_more = page.has_more;
        let next = page.next_cursor().map(str::to_string);
        let added = page.merge_into(&mut history);
        log::debug!("[Chats] Merged {} messages", added);
        if !all || !has_more || added == 0 || next.is_none() {
            print_messages(&history, next.filter(|_| has_more));
            return Ok(());
        }
        cursor = next;
    }
}

fn print_channels(channels: &[ChannelWithUser], more_before: Option<String>) {
    if channels.is_empty() {
        println!("No chat channels");
    }
    for pair in channels {
        let channel = &pair.chat_channel;
        println!(
            "{}  {:<20} {}",
            channel.id,
            pair.other_user.username,
            channel.last_message_at.as_deref().unwrap_or(&channel.updated_at)
        );
        if let Some(preview) = channel.last_message_content.as_deref().filter(|p| !p.is_empty()) {
            println!("    {}", preview);
        }
    }
    if let Some(cursor) = more_before {
        println!();
        println!("More channels: --before {}", cursor);
    }
}

fn print_messages(history: &[ChatMessage], more_before: Option<String>) {
    if let Some(cursor) = more_before {
        println!("Older messages: --before {}", cursor);
        println!();
    }
    if history.is_empty() {
        println!("No messages");
    }
    for message in history {
        println!("[{}] {}: {}", message.created_at, message.src_user_id, message.summary());
    }
}
