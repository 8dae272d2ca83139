//! Statistics commands - refresh counters and query the submission log.

use roster::Instance;

use crate::cli::StatsCommand;
use crate::output::{OutputFormat, print_json, print_table};

/// Run a stats subcommand
pub async fn run(
    instance: &Instance,
    command: &StatsCommand,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let stats = instance.stats();

    match command {
        StatsCommand::Refresh { user_id } => {
            let (ac_num, submit_num) = stats.refresh_counters(*user_id).await?;
            match format {
                OutputFormat::Human => {
                    println!("Accepted:    {ac_num}");
                    println!("Submitted:   {submit_num}");
                }
                OutputFormat::Json => print_json(&serde_json::json!({
                    "ac_num": ac_num,
                    "submit_num": submit_num,
                }))?,
            }
        }
        StatsCommand::Accepted { user_id } => {
            let ids = stats.accepted_problem_ids(*user_id).await?;
            match format {
                OutputFormat::Human => {
                    let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
                    println!("{}", ids.join(" "));
                }
                OutputFormat::Json => print_json(&serde_json::json!(ids))?,
            }
        }
        StatsCommand::Histogram { user_id } => {
            let histogram = stats.status_histogram(*user_id).await?;
            match format {
                OutputFormat::Human => {
                    let rows: Vec<Vec<String>> = histogram
                        .iter()
                        .map(|(category, count)| vec![category.to_string(), count.to_string()])
                        .collect();
                    print_table(&["STATUS", "COUNT"], &rows);
                }
                OutputFormat::Json => {
                    let map: serde_json::Map<String, serde_json::Value> = histogram
                        .iter()
                        .map(|(category, count)| (category.to_string(), count.into()))
                        .collect();
                    print_json(&serde_json::Value::Object(map))?;
                }
            }
        }
        StatsCommand::Language { user_id } => {
            let language = stats.last_submission_language(*user_id).await?;
            match format {
                OutputFormat::Human => println!("{}", language.as_deref().unwrap_or("-")),
                OutputFormat::Json => print_json(&serde_json::json!({ "language": language }))?,
            }
        }
    }

    Ok(())
}
