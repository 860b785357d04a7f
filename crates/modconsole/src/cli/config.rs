//! Config command handlers.

use modconsole_core::config::Config;

use crate::cli::args::ConfigCommands;

/// Handle config subcommands. Returns true on success.
pub fn handle_config_command(command: ConfigCommands) -> bool {
    match command {
        ConfigCommands::Show => handle_show(),
        ConfigCommands::Set { key, value } => handle_set(&key, &value),
        ConfigCommands::Path => match Config::config_path() {
            Some(path) => {
                println!("{}", path.display());
                true
            }
            None => {
                eprintln!("✗ Could not determine config directory");
                false
            }
        },
    }
}

fn handle_show() -> bool {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Error loading config: {}", e);
            return false;
        }
    };

    if let Some(path) = Config::config_path() {
        let origin = if path.exists() { "" } else { " (not created yet, showing defaults)" };
        println!("# {}{}", path.display(), origin);
    }
    match toml::to_string_pretty(&config) {
        Ok(text) => {
            print!("{}", text);
            true
        }
        Err(e) => {
            eprintln!("✗ Could not render config: {}", e);
            false
        }
    }
}

fn handle_set(key: &str, value: &str) -> bool {
    // A broken file is replaced rather than blocking every fix.
    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: ignoring unreadable config: {}", e);
        Config::default()
    });

    if let Err(e) = config.set(key, value) {
        eprintln!("✗ {}", e);
        return false;
    }

    match config.save() {
        Ok(()) => {
            println!("✓ Set {} = {}", key, value);
            true
        }
        Err(e) => {
            eprintln!("✗ Error saving config: {}", e);
            false
        }
    }
}
