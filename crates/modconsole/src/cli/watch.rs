//! `watch`: a live view of the realtime channel.

use chrono::Local;
use modconsole_core::config::Config;
use modconsole_core::realtime::ConnectionStatus;

use crate::cli::block_on;
use crate::cli::util::open_session;

/// Handle `watch`. Runs until Ctrl-C.
pub fn handle_watch(config: &Config, topic: Option<&str>) -> bool {
    block_on(watch(config, topic)).unwrap_or(false)
}

async fn watch(config: &Config, topic: Option<&str>) -> bool {
    let Some((mut session, mut notices)) = open_session(config) else {
        return false;
    };
    let Some(manager) = session.resume().cloned() else {
        eprintln!("✗ Not logged in. Run 'modconsole login <phone>' first.");
        return false;
    };
    let (_subscription, mut events) = manager.subscribe_channel();
    let mut status = manager.watch_connection();

    println!("Watching realtime events (Ctrl-C to stop)...");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let ok = loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    eprintln!("Failed to listen for Ctrl+C: {}", e);
                    break false;
                }
                println!("\nShutting down...");
                break true;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    eprintln!("✗ Realtime connection stopped");
                    break false;
                }
                let current = *status.borrow_and_update();
                println!("{} {}", timestamp(), describe(current));
            }
            Some(message) = events.recv() => {
                if topic.is_some_and(|wanted| !message.is(wanted)) {
                    continue;
                }
                println!("{} {} {}", timestamp(), message.topic, message.payload);
            }
            Some(notice) = notices.recv() => {
                eprintln!("{} ! {}", timestamp(), notice);
            }
        }
    };

    manager.cleanup();
    ok
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S%.3f").to_string()
}

fn describe(status: ConnectionStatus) -> String {
    match (status.connected, status.stamp) {
        (true, Some(stamp)) => format!("* connected (stamp {})", stamp),
        (true, None) => "* connected".to_string(),
        (false, _) => "* disconnected".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modconsole_core::realtime::ConnectionStamp;

    #[test]
    fn test_describe_status() {
        assert_eq!(describe(ConnectionStatus::default()), "* disconnected");

        let stamp = ConnectionStamp::next(None);
        let connected = ConnectionStatus {
            stamp: Some(stamp),
            connected: true,
        };
        assert_eq!(describe(connected), format!("* connected (stamp {})", stamp));
    }
}
