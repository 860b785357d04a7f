//! Command dispatch for the `modconsole` binary.

/// Clap argument definitions
mod args;

/// `login`, `logout`, `status`
mod auth;

/// Chat channel and message listings
mod chats;

/// Config command handlers
mod config;

/// Moderation task queues
mod tasks;

/// User profile display
mod user;

/// Verification video review
mod video;

/// Shared CLI utilities
mod util;

/// Live view of the realtime channel
mod watch;

use std::future::Future;

use clap::Parser;
use modconsole_core::config::Config;

pub use args::Cli;
use args::Commands;
use util::load_config;

/// Main entry point for the CLI
pub fn run_cli() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Execute commands and track success
    let success = match cli.command {
        // Config commands must work even when the file is broken.
        Commands::Config { command } => config::handle_config_command(command),

        command => match load_config() {
            Some(config) => run_command(command, &config),
            None => false,
        },
    };

    if !success {
        std::process::exit(1);
    }
}

fn run_command(command: Commands, config: &Config) -> bool {
    match command {
        Commands::Login { phone, otp } => auth::handle_login(config, &phone, otp.as_deref()),

        Commands::Logout => auth::handle_logout(config),

        Commands::Status { probe } => auth::handle_status(config, probe),

        Commands::Tasks { command } => tasks::handle_task_command(config, command),

        Commands::User { id, json } => user::handle_user(config, &id, json),

        Commands::Chats { command } => chats::handle_chat_command(config, command),

        Commands::Video { command } => video::handle_video_command(config, command),

        Commands::Watch { topic } => watch::handle_watch(config, topic.as_deref()),

        Commands::Config { command } => config::handle_config_command(command),
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

/// Helper to run async operations in sync context
fn block_on<F: Future>(f: F) -> Option<F::Output> {
    match tokio::runtime::Runtime::new() {
        Ok(runtime) => Some(runtime.block_on(f)),
        Err(e) => {
            eprintln!("✗ Failed to start async runtime: {}", e);
            None
        }
    }
}
