//! Privilege commands - read, reconcile and check grants.

use roster::Instance;

use crate::cli::PrivilegesCommand;
use crate::output::{OutputFormat, print_json};

/// Run a privileges subcommand
pub async fn run(
    instance: &Instance,
    command: &PrivilegesCommand,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let privileges = instance.privileges();

    match command {
        PrivilegesCommand::Get { user_id } => {
            let held = privileges.get_privileges(*user_id).await?;
            match format {
                OutputFormat::Human => {
                    for privilege in &held {
                        println!("{privilege}");
                    }
                }
                OutputFormat::Json => print_json(&serde_json::json!(held))?,
            }
        }
        PrivilegesCommand::Set {
            user_id,
            privileges: requested,
        } => {
            let plan = privileges
                .set_privileges(*user_id, requested.iter().cloned())
                .await?;
            match format {
                OutputFormat::Human => {
                    if plan.is_empty() {
                        println!("No changes");
                    }
                    for privilege in &plan.removed {
                        println!("- {privilege}");
                    }
                    for privilege in &plan.added {
                        println!("+ {privilege}");
                    }
                }
                OutputFormat::Json => print_json(&serde_json::json!({
                    "removed": plan.removed,
                    "added": plan.added,
                }))?,
            }
        }
        PrivilegesCommand::Check { user_id, privilege } => {
            let allowed = privileges.has_privilege(*user_id, privilege).await?;
            match format {
                OutputFormat::Human => println!("{}", if allowed { "yes" } else { "no" }),
                OutputFormat::Json => print_json(&serde_json::json!({
                    "user_id": user_id,
                    "privilege": privilege,
                    "allowed": allowed,
                }))?,
            }
        }
    }

    Ok(())
}
