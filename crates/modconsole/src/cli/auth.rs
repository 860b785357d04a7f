//! Login, logout and status handlers.
//!
//! Login is the two-step OTP exchange: request a code, then trade it for a
//! bearer token that is saved next to the config file.

use std::io::{self, Write};
use std::time::Duration;

use modconsole_core::api::AdminClient;
use modconsole_core::auth::AuthStore;
use modconsole_core::config::Config;
use modconsole_core::notice::Notice;

use crate::cli::block_on;
use crate::cli::util::{open_session, prompt_line};

/// How long `status --probe` waits for the realtime channel to open.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle `login`. Without `--otp` a code is requested and prompted for.
pub fn handle_login(config: &Config, phone: &str, otp: Option<&str>) -> bool {
    let client = match AdminClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("✗ {}", e);
            return false;
        }
    };

    let code = match otp {
        Some(code) => code.trim().to_string(),
        None => {
            println!("Requesting a one-time code for {}...", phone);
            match block_on(client.send_otp(phone)) {
                Some(Ok(())) => {}
                Some(Err(e)) => {
                    eprintln!("✗ Could not send code: {}", e);
                    return false;
                }
                None => return false,
            }
            match prompt_line("Code: ") {
                Some(code) => code,
                None => return false,
            }
        }
    };

    if code.is_empty() {
        eprintln!("✗ No code entered");
        return false;
    }

    let credential = match block_on(client.verify_otp(phone, &code)) {
        Some(Ok(credential)) => credential,
        Some(Err(e)) => {
            eprintln!("✗ Login failed: {}", e);
            return false;
        }
        None => return false,
    };

    let Some((mut session, mut notices)) = open_session(config) else {
        return false;
    };
    if let Err(e) = session.remember(&credential) {
        eprintln!("✗ Login failed: {}", e);
        return false;
    }
    let mut saved = true;
    while let Ok(notice) = notices.try_recv() {
        eprintln!("Warning: {}", notice);
        saved &= !matches!(notice, Notice::StateSaveFailed { .. });
    }

    if saved {
        println!("✓ Logged in as {}", phone);
    }
    saved
}

/// Handle `logout`.
pub fn handle_logout(config: &Config) -> bool {
    let Some((mut session, mut notices)) = open_session(config) else {
        return false;
    };
    if !session.is_authenticated() {
        println!("Not logged in.");
        return true;
    }

    session.logout();
    let mut ok = true;
    while let Ok(notice) = notices.try_recv() {
        eprintln!("✗ {}", notice);
        ok = false;
    }
    if ok {
        println!("✓ Logged out");
    }
    ok
}

/// Handle `status`: login state, endpoints and optionally a realtime probe.
pub fn handle_status(config: &Config, probe: bool) -> bool {
    println!("API:        {}", config.api_base_url);
    println!("Admin API:  {}", config.admin_api_base_url);
    if let Some(path) = AuthStore::default_path() {
        println!("Auth state: {}", path.display());
    }

    let Some((session, _notices)) = open_session(config) else {
        return false;
    };
    match session.credential() {
        Some(credential) => println!("Logged in:  yes (token {})", credential.redacted()),
        None => {
            println!("Logged in:  no");
            return !probe;
        }
    }
    drop(session);

    if !probe {
        return true;
    }
    block_on(probe_realtime(config)).unwrap_or(false)
}

async fn probe_realtime(config: &Config) -> bool {
    let Some((mut session, mut notices)) = open_session(config) else {
        return false;
    };
    let Some(manager) = session.resume() else {
        return false;
    };
    let mut status = manager.watch_connection();

    print!("Realtime:   connecting... ");
    let _ = io::stdout().flush();

    let deadline = tokio::time::sleep(config.realtime.initial_connect_delay() + PROBE_TIMEOUT);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            changed = status.wait_for(|s| s.connected) => {
                return match changed {
                    Ok(current) => {
                        let stamp = current.stamp.map(|s| s.to_string()).unwrap_or_default();
                        println!("connected (stamp {})", stamp);
                        true
                    }
                    Err(_) => {
                        println!("stopped");
                        false
                    }
                };
            }
            Some(notice) = notices.recv() => {
                println!();
                eprintln!("  {}", notice);
                if matches!(notice, Notice::ConnectionLimitReached | Notice::ReconnectAbandoned) {
                    return false;
                }
            }
            _ = &mut deadline => {
                println!("timed out");
                return false;
            }
        }
    }
}
