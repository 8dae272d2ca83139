//! Account commands - create, show, find and destroy accounts.

use roster::{Instance, UserAccount};

use crate::cli::AccountCommand;
use crate::output::{OutputFormat, print_json, print_table};

/// Run an account subcommand
pub async fn run(
    instance: &Instance,
    command: &AccountCommand,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let accounts = instance.accounts();

    match command {
        AccountCommand::Create {
            username,
            email,
            admin,
        } => {
            let mut account = UserAccount::new(username.as_str()).with_admin(*admin);
            if let Some(email) = email {
                account = account.with_email(email.as_str());
            }
            let account = accounts.create_account(account).await?;
            print_account(&account, format)?;
        }
        AccountCommand::Show { user_id } => {
            let account = accounts.get_account(*user_id).await?;
            let uploads = accounts.load_relationships(*user_id).await?;
            match format {
                OutputFormat::Human => {
                    print_account(&account, format)?;
                    println!();
                    let rows: Vec<Vec<String>> = uploads
                        .iter()
                        .map(|r| vec![r.filename.clone(), r.size.to_string()])
                        .collect();
                    if rows.is_empty() {
                        println!("No tracked uploads");
                    } else {
                        print_table(&["FILENAME", "SIZE"], &rows);
                    }
                }
                OutputFormat::Json => {
                    print_json(&serde_json::json!({
                        "account": account,
                        "uploads": uploads,
                    }))?;
                }
            }
        }
        AccountCommand::Find { username, email } => {
            let found = match (username, email) {
                (Some(username), _) => accounts.find_by_username(username).await?,
                (None, Some(email)) => accounts.find_by_email(email).await?,
                (None, None) => None,
            };
            match found {
                Some(account) => print_account(&account, format)?,
                None => match format {
                    OutputFormat::Human => println!("No matching account"),
                    OutputFormat::Json => print_json(&serde_json::Value::Null)?,
                },
            }
        }
        AccountCommand::Destroy { user_id } => {
            accounts.destroy(*user_id).await?;
            match format {
                OutputFormat::Human => println!("Deleted account {user_id}"),
                OutputFormat::Json => print_json(&serde_json::json!({ "deleted": user_id }))?,
            }
        }
    }

    Ok(())
}

fn print_account(
    account: &UserAccount,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Human => {
            let none = || "-".to_string();
            println!("Id:          {}", account.id);
            println!(
                "Username:    {}",
                account.username.clone().unwrap_or_else(none)
            );
            println!("Email:       {}", account.email.clone().unwrap_or_else(none));
            println!("Admin:       {}", account.is_admin);
            println!("Accepted:    {}", account.ac_num);
            println!("Submitted:   {}", account.submit_num);
        }
        OutputFormat::Json => print_json(&serde_json::to_value(account)?)?,
    }
    Ok(())
}
