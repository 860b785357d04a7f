//! Verification video review.
//!
//! Edits are processed asynchronously by the backend; the only completion
//! signal is an event on the realtime channel. `video edit --wait` opens
//! the channel before submitting so the event cannot be missed.

use std::time::Duration;

use modconsole_core::api::AdminClient;
use modconsole_core::config::Config;
use modconsole_core::model::VideoEdit;
use modconsole_core::notice::Notice;
use modconsole_core::realtime::VIDEO_EDIT_COMPLETED;

use crate::cli::args::VideoCommands;
use crate::cli::block_on;
use crate::cli::util::{admin_client, open_session, prompt_confirm, report};

/// Handle video subcommands. Returns true on success.
pub fn handle_video_command(config: &Config, command: VideoCommands) -> bool {
    match command {
        VideoCommands::Edit {
            user_id,
            start,
            end,
            rotation,
            wait,
        } => handle_edit(config, &user_id, start, end, rotation, wait),

        VideoCommands::Reject {
            user_id,
            task_id,
            yes,
        } => {
            if !yes && !prompt_confirm("Are you sure you want to reject this verification video?") {
                println!("Cancelled.");
                return true;
            }
            let Some(client) = admin_client(config) else {
                return false;
            };
            let ok = report(block_on(client.reject_verification_video(&user_id, &task_id)));
            if ok {
                println!("✓ Rejected verification video of {}", user_id);
            }
            ok
        }

        VideoCommands::Confirm { user_id, task_id } => {
            let Some(client) = admin_client(config) else {
                return false;
            };
            let ok = report(block_on(
                client.confirm_edited_verification_video(&user_id, &task_id),
            ));
            if ok {
                println!("✓ Confirmed edited verification video of {}", user_id);
            }
            ok
        }
    }
}

fn handle_edit(
    config: &Config,
    user_id: &str,
    start: f64,
    end: f64,
    rotation: u16,
    wait: Option<u64>,
) -> bool {
    let edit = match VideoEdit::new(start, end, rotation) {
        Ok(edit) => edit,
        Err(e) => {
            eprintln!("✗ {}", e);
            return false;
        }
    };
    let Some(client) = admin_client(config) else {
        return false;
    };

    println!(
        "Trimming {:.2}s to {:.2}s, rotating {}°",
        edit.start_secs(),
        edit.end_secs(),
        edit.rotation().degrees()
    );

    match wait {
        None => {
            let ok = report(block_on(client.edit_verification_video(user_id, &edit)));
            if ok {
                println!("✓ Edit requested");
            }
            ok
        }
        Some(secs) => block_on(edit_and_wait(
            config,
            &client,
            user_id,
            &edit,
            Duration::from_secs(secs),
        ))
        .unwrap_or(false),
    }
}

async fn edit_and_wait(
    config: &Config,
    client: &AdminClient,
    user_id: &str,
    edit: &VideoEdit,
    timeout: Duration,
) -> bool {
    let Some((mut session, mut notices)) = open_session(config) else {
        return false;
    };
    let Some(manager) = session.resume().cloned() else {
        eprintln!("✗ Not logged in. Run 'modconsole login <phone>' first.");
        return false;
    };
    let (_subscription, mut events) = manager.subscribe_channel();
    let mut status = manager.watch_connection();

    let deadline = tokio::time::sleep(config.realtime.initial_connect_delay() + timeout);
    tokio::pin!(deadline);

    let connected = tokio::select! {
        changed = status.wait_for(|s| s.connected) => changed.is_ok(),
        _ = &mut deadline => false,
    };
    if !connected {
        eprintln!("Warning: realtime channel is not connected; not waiting for completion");
    }

    if let Err(e) = client.edit_verification_video(user_id, edit).await {
        eprintln!("✗ Failed to request editing video: {}", e);
        return false;
    }
    if !connected {
        println!("✓ Edit requested");
        return true;
    }
    println!("Edit requested, waiting for completion...");

    loop {
        tokio::select! {
            Some(message) = events.recv() => {
                if !message.is(VIDEO_EDIT_COMPLETED) {
                    log::debug!("[Video] Ignoring '{}' while waiting", message.topic);
                    continue;
                }
                println!("✓ Edit completed");
                show_edited_video(client, user_id).await;
                return true;
            }
            Some(notice) = notices.recv() => {
                eprintln!("Warning: {}", notice);
                if matches!(notice, Notice::ConnectionLimitReached | Notice::ReconnectAbandoned) {
                    return false;
                }
            }
            _ = &mut deadline => {
                eprintln!("✗ Timed out waiting for the edit. It may still complete later.");
                return false;
            }
        }
    }
}

async fn show_edited_video(client: &AdminClient, user_id: &str) {
    match client.user(user_id).await {
        Ok(user) => {
            if let Some(detail) = user.metadata.verification_album_original_edited_detail {
                println!("  Edited video: {}", detail);
            }
        }
        Err(e) => log::warn!("[Video] Could not refresh user {}: {}", user_id, e),
    }
}
