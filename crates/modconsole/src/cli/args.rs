//! Command-line argument structures and enums

use clap::{Parser, Subcommand};
use modconsole_core::model::{QueueType, TaskStatus};

#[derive(Parser)]
#[command(name = "modconsole")]
#[command(version)]
#[command(about = "Work the moderation queues from a terminal", long_about = None)]
pub struct Cli {
    /// Print debug logs (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in with a one-time code sent to your phone
    Login {
        /// Phone number in international format
        phone: String,

        /// Code from the SMS (prompted for when omitted)
        #[arg(long)]
        otp: Option<String>,
    },

    /// Forget the saved credential
    Logout,

    /// Show login state and configured endpoints
    Status {
        /// Also open the realtime channel and report whether it connects
        #[arg(long)]
        probe: bool,
    },

    /// Moderation tasks
    #[command(alias = "t")]
    Tasks {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Show a user's profile
    User {
        /// User id
        id: String,

        /// Print the raw JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Browse a user's chats
    Chats {
        #[command(subcommand)]
        command: ChatCommands,
    },

    /// Verification video review
    Video {
        #[command(subcommand)]
        command: VideoCommands,
    },

    /// Print realtime events and connection changes until Ctrl-C
    Watch {
        /// Only print events with this topic
        #[arg(long)]
        topic: Option<String>,
    },

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Number of tasks per queue
    Counts {
        /// Task status to count
        #[arg(short, long, default_value = "unresolved")]
        status: TaskStatus,
    },

    /// Show the oldest task in a queue
    Next {
        /// Queue name or code (profile_report, chat_report, verification)
        queue: QueueType,

        /// Task status to look at
        #[arg(short, long, default_value = "unresolved")]
        status: TaskStatus,
    },

    /// Mark a task resolved
    Resolve {
        /// Task id
        id: String,
    },

    /// Put a task aside for later
    Defer {
        /// Task id
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ChatCommands {
    /// List a user's chat channels, newest first
    Channels {
        /// User id
        user_id: String,

        /// Only channels updated before this timestamp
        #[arg(long)]
        before: Option<String>,

        /// Keep fetching until there are no more pages
        #[arg(long)]
        all: bool,
    },

    /// Show a channel's messages, oldest first
    Messages {
        /// Channel id
        channel_id: String,

        /// Only messages sent before this timestamp
        #[arg(long)]
        before: Option<String>,

        /// Keep fetching until there are no more pages
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
pub enum VideoCommands {
    /// Trim and rotate a verification video
    Edit {
        /// Owner of the video
        user_id: String,

        /// Trim start in seconds
        #[arg(long)]
        start: f64,

        /// Trim end in seconds
        #[arg(long)]
        end: f64,

        /// Clockwise rotation in degrees (0, 90, 180, 270)
        #[arg(long, default_value_t = 0)]
        rotation: u16,

        /// Wait up to this many seconds for the edit to finish
        #[arg(long, value_name = "SECS")]
        wait: Option<u64>,
    },

    /// Reject a verification video
    Reject {
        /// Owner of the video
        user_id: String,

        /// Task the video belongs to
        task_id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Accept the edited verification video
    Confirm {
        /// Owner of the video
        user_id: String,

        /// Task the video belongs to
        task_id: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Set a value by its dotted key (e.g. realtime.pong_timeout_ms)
    Set {
        /// Configuration key
        key: String,

        /// New value
        value: String,
    },

    /// Print the configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_queue_accepts_name_or_code() {
        let cli = Cli::try_parse_from(["modconsole", "tasks", "next", "chat-report"]).unwrap();
        let Commands::Tasks {
            command: TaskCommands::Next { queue, status },
        } = cli.command
        else {
            panic!("expected tasks next");
        };
        assert_eq!(queue, QueueType::ChatReport);
        assert_eq!(status, TaskStatus::Unresolved);

        let cli = Cli::try_parse_from(["modconsole", "tasks", "next", "3", "-s", "deferred"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Tasks {
                command: TaskCommands::Next {
                    queue: QueueType::Verification,
                    status: TaskStatus::Deferred,
                }
            }
        ));
    }

    #[test]
    fn test_unknown_queue_is_rejected() {
        assert!(Cli::try_parse_from(["modconsole", "tasks", "next", "spam"]).is_err());
    }

    #[test]
    fn test_video_edit_arguments() {
        let cli = Cli::try_parse_from([
            "modconsole", "video", "edit", "u1", "--start", "1.5", "--end", "4", "--wait", "30",
        ])
        .unwrap();
        let Commands::Video {
            command:
                VideoCommands::Edit {
                    user_id,
                    start,
                    end,
                    rotation,
                    wait,
                },
        } = cli.command
        else {
            panic!("expected video edit");
        };
        assert_eq!(user_id, "u1");
        assert_eq!((start, end, rotation, wait), (1.5, 4.0, 0, Some(30)));
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::try_parse_from(["modconsole", "watch", "-v"]).unwrap();
        assert!(cli.verbose);
    }
}
