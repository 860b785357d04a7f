//! Shared CLI utilities

use std::io::{self, Write};

use modconsole_core::api::AdminClient;
use modconsole_core::auth::{AuthStore, Session};
use modconsole_core::config::Config;
use modconsole_core::error::Result;
use modconsole_core::notice::{self, NoticeReceiver};

/// Print `label` and read one trimmed line from stdin.
pub fn prompt_line(label: &str) -> Option<String> {
    print!("{}", label);
    let _ = io::stdout().flush();

    let mut line = String::new();
    match io::stdin().read_line(&mut line) {
        Ok(_) => Some(line.trim().to_string()),
        Err(e) => {
            eprintln!("✗ Could not read input: {}", e);
            None
        }
    }
}

/// Ask a yes/no question. Anything but an explicit yes is a no.
pub fn prompt_confirm(message: &str) -> bool {
    prompt_line(&format!("{} [y/N] ", message)).is_some_and(|answer| is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Print the error of a failed command. Returns true on success.
pub fn report<T>(outcome: Option<Result<T>>) -> bool {
    match outcome {
        Some(Ok(_)) => true,
        Some(Err(e)) => {
            eprintln!("✗ {}", e);
            if e.is_unauthorized() {
                eprintln!("  Your session may have expired. Run 'modconsole login <phone>' again.");
            }
            false
        }
        None => false,
    }
}

/// Load the config file, printing why when it is unusable.
pub fn load_config() -> Option<Config> {
    match Config::load() {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("✗ Error loading config: {}", e);
            if let Some(path) = Config::config_path() {
                eprintln!("  Fix or remove {}", path.display());
            }
            None
        }
    }
}

/// Open the saved session. Problems restoring it are printed, not fatal.
pub fn open_session(config: &Config) -> Option<(Session, NoticeReceiver)> {
    let store = match AuthStore::open_default() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("✗ {}", e);
            return None;
        }
    };
    let (tx, mut rx) = notice::channel();
    let session = Session::open(store, config.clone(), tx);
    while let Ok(notice) = rx.try_recv() {
        eprintln!("Warning: {}", notice);
    }
    Some((session, rx))
}

/// Admin API client carrying the saved credential.
pub fn admin_client(config: &Config) -> Option<AdminClient> {
    let (session, _notices) = open_session(config)?;
    let Some(credential) = session.credential() else {
        eprintln!("✗ Not logged in. Run 'modconsole login <phone>' first.");
        return None;
    };

    match AdminClient::new(config) {
        Ok(client) => Some(client.with_credential(credential)),
        Err(e) => {
            eprintln!("✗ {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_explicit_yes_confirms() {
        assert!(is_yes("y"));
        assert!(is_yes(" YES\n"));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }

    #[test]
    fn test_report_maps_outcome_to_success() {
        assert!(report(Some(Ok(1))));
        assert!(!report::<()>(Some(Err(
            modconsole_core::error::ConsoleError::NotLoggedIn
        ))));
        assert!(!report::<()>(None));
    }
}
