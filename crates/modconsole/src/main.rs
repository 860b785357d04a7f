//! `modconsole` - work the moderation queues from a terminal.

/// CLI module - command-line interface for the moderation console
mod cli;

fn main() {
    cli::run_cli();
}
