//! Model management CLI commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, ModelExplanation, ReloadResponse};
use crate::output::{format_probability, print_json, print_success, print_table, OutputFormat};

/// Row for feature importances
#[derive(Tabled)]
struct ImportanceRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "Importance")]
    importance: String,
}

/// Show feature importances of the active model
pub async fn explain(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let explanation: ModelExplanation = client.get("api/model/explain").await?;

    match format {
        OutputFormat::Json => print_json(&explanation)?,
        OutputFormat::Table => {
            println!("{}", "Model Explanation".bold());
            println!("{}", "=".repeat(60));
            println!("Version:   {}", explanation.model_version.cyan());
            println!(
                "Threshold: {} ({})",
                format_probability(explanation.threshold),
                explanation.threshold_source
            );
            println!();

            let rows = explanation
                .feature_importances
                .iter()
                .enumerate()
                .map(|(i, f)| ImportanceRow {
                    rank: i + 1,
                    feature: f.feature.clone(),
                    importance: format!("{:.4}", f.importance),
                })
                .collect();
            print_table(rows, "Model reports no features");
        }
    }

    Ok(())
}

/// Ask the server to re-read the model artifacts (admin)
pub async fn reload(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let response: ReloadResponse = client.post("api/model/reload", &serde_json::json!({})).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            print_success(&format!("Loaded model {}", response.model_version.cyan()));
            println!("Checksum:  {}", response.checksum);
            println!(
                "Threshold: {} ({})",
                format_probability(response.threshold),
                response.threshold_source
            );
            println!("Loaded at: {}", format_timestamp(response.loaded_at));
        }
    }

    Ok(())
}

/// Format a unix timestamp for display
fn format_timestamp(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
        assert_eq!(format_timestamp(1_700_000_000), "2023-11-14 22:13:20 UTC");
    }
}
