//! File commands - list, upload and delete a user's uploads.

use roster::Instance;

use crate::cli::FilesCommand;
use crate::output::{OutputFormat, print_json, print_table};

/// Run a files subcommand
pub async fn run(
    instance: &Instance,
    command: &FilesCommand,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let files = instance.files();

    match command {
        FilesCommand::List { user_id } => {
            let listing = files.list(*user_id).await;
            match format {
                OutputFormat::Human => match listing {
                    None => println!("No upload directory for user {user_id}"),
                    Some(listing) if listing.files.is_empty() => println!("No files"),
                    Some(listing) => {
                        let rows: Vec<Vec<String>> = listing
                            .files
                            .iter()
                            .map(|f| vec![f.filename.clone(), f.size.to_string()])
                            .collect();
                        print_table(&["FILENAME", "SIZE"], &rows);
                        println!();
                        println!("Total: {} bytes", listing.total_size());
                    }
                },
                OutputFormat::Json => print_json(&serde_json::to_value(&listing)?)?,
            }
        }
        FilesCommand::Upload {
            user_id,
            source,
            name,
            no_limit,
        } => {
            let filename = match name {
                Some(name) => name.clone(),
                None => source
                    .file_name()
                    .and_then(|n| n.to_str())
                    .ok_or("source has no usable file name; pass --name")?
                    .to_string(),
            };
            let size = tokio::fs::metadata(source).await?.len();
            let outcome = files
                .upload(*user_id, &filename, source, size, *no_limit)
                .await?;
            match format {
                OutputFormat::Human => {
                    let verb = if outcome.replaced { "Replaced" } else { "Stored" };
                    println!("{verb} {filename} ({size} bytes) for user {user_id}");
                }
                OutputFormat::Json => print_json(&serde_json::json!({
                    "filename": filename,
                    "size": size,
                    "replaced": outcome.replaced,
                    "previous_size": outcome.previous_size,
                    "previous_count": outcome.previous_count,
                }))?,
            }
        }
        FilesCommand::Delete { user_id, filename } => {
            files.delete(*user_id, filename).await?;
            match format {
                OutputFormat::Human => println!("Deleted {filename} for user {user_id}"),
                OutputFormat::Json => print_json(&serde_json::json!({ "deleted": filename }))?,
            }
        }
    }

    Ok(())
}
