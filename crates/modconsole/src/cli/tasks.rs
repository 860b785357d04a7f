//! Task queue handlers.

use modconsole_core::config::Config;
use modconsole_core::error::ConsoleError;
use modconsole_core::model::{QueueType, Task, TaskStatus};

use crate::cli::args::TaskCommands;
use crate::cli::block_on;
use crate::cli::util::{admin_client, report};

/// Handle task subcommands. Returns true on success.
pub fn handle_task_command(config: &Config, command: TaskCommands) -> bool {
    let Some(client) = admin_client(config) else {
        return false;
    };

    let outcome = block_on(async {
        match command {
            TaskCommands::Counts { status } => {
                let counts = client.task_counts(status).await?;
                println!("{} tasks", status);
                for queue in QueueType::ALL {
                    println!("  {:<20} {}", queue.label(), counts.count_for(queue));
                }
            }

            TaskCommands::Next { queue, status } => {
                match client.oldest_task(status, queue).await? {
                    Some(task) => print_task(&task),
                    None => println!("No {} tasks in {}", status.label().to_lowercase(), queue.label()),
                }
            }

            TaskCommands::Resolve { id } => {
                client.update_task_status(&id, TaskStatus::Resolved).await?;
                println!("✓ Resolved task {}", id);
            }

            TaskCommands::Defer { id } => {
                client.update_task_status(&id, TaskStatus::Deferred).await?;
                println!("✓ Deferred task {}", id);
            }
        }
        Ok::<(), ConsoleError>(())
    });

    report(outcome)
}

fn print_task(task: &Task) {
    println!("Task {}", task.id);
    println!("  Queue:    {}", task.queue_type);
    println!("  Status:   {}", task.status);
    println!("  Reporter: {}", task.src_user_id);
    println!("  Subject:  {}", task.dst_user_id);
    println!("  Created:  {}", task.created_at);
    if !task.metadata.is_null() {
        match serde_json::to_string_pretty(&task.metadata) {
            Ok(text) => println!("  Metadata: {}", text.replace('\n', "\n  ")),
            Err(e) => log::warn!("[Tasks] Could not render metadata: {}", e),
        }
    }
}
