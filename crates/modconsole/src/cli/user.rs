//! User profile display.

use modconsole_core::config::Config;
use modconsole_core::model::{ProfileField, User, format_height};

use crate::cli::block_on;
use crate::cli::util::{admin_client, report};

/// Handle `user <id>`.
pub fn handle_user(config: &Config, id: &str, json: bool) -> bool {
    let Some(client) = admin_client(config) else {
        return false;
    };

    let user = match block_on(client.user(id)) {
        Some(Ok(user)) => user,
        failed => return report(failed),
    };

    if json {
        return match serde_json::to_string_pretty(&user) {
            Ok(text) => {
                println!("{}", text);
                true
            }
            Err(e) => {
                eprintln!("✗ {}", e);
                false
            }
        };
    }

    print_user(&user);
    true
}

fn print_user(user: &User) {
    println!("{} (@{})", user.display_name(), user.username);
    println!("  Id:        {}", user.id);
    println!("  Age:       {}", user.age);
    if let Some(height) = format_height(user.height) {
        println!("  Height:    {}", height);
    }

    let fields = [
        ("Gender", ProfileField::Gender),
        ("Body type", ProfileField::BodyType),
        ("Drinks", ProfileField::Drink),
        ("Smokes", ProfileField::Smoke),
        ("Tattoos", ProfileField::Tattoo),
        ("Ethnicity", ProfileField::Ethnicity),
        ("MBTI", ProfileField::Mbti),
        ("Pace", ProfileField::RelationshipSpeed),
    ];
    for (name, field) in fields {
        if let Some(label) = user.label(field) {
            println!("  {:<10} {}", format!("{}:", name), label);
        }
    }

    let interests = user.metadata.interest_labels();
    if !interests.is_empty() {
        println!("  Interests: {}", interests.join(", "));
    }
    if let Some(bio) = user.metadata.bio.as_deref().filter(|b| !b.is_empty()) {
        println!("  Bio:       {}", bio);
    }

    let mut flags = Vec::new();
    if user.is_verified {
        flags.push("verified");
    }
    if user.metadata.review_in_progress() {
        flags.push("verification under review");
    }
    if user.is_online {
        flags.push("online");
    }
    if user.is_hidden {
        flags.push("hidden");
    }
    if user.blocked {
        flags.push("blocked");
    }
    if user.deleted {
        flags.push("deleted");
    }
    if !flags.is_empty() {
        println!("  Flags:     {}", flags.join(", "));
    }

    println!(
        "  Albums:    {} public, {} private",
        user.metadata.public_album().len(),
        user.metadata.private_album().len()
    );
    println!("  Joined:    {}", user.created_at);
    if !user.last_online.is_empty() {
        println!("  Last seen: {}", user.last_online);
    }
}
