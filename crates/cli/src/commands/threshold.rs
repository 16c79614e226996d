//! Decision threshold CLI commands

use anyhow::{bail, Result};

use crate::client::{ApiClient, ThresholdRequest, ThresholdResponse};
use crate::output::{format_probability, print_info, print_json, print_success, print_warning, OutputFormat};

/// Show the effective decision threshold (admin)
pub async fn get(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let response: ThresholdResponse = client.get("api/settings/threshold").await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => print_info(&format!(
            "Threshold: {} (source: {})",
            format_probability(response.threshold),
            response.source
        )),
    }

    Ok(())
}

/// Store a new user threshold (admin)
pub async fn set(client: &ApiClient, value: f64, format: OutputFormat) -> Result<()> {
    if !(value > 0.0 && value < 1.0) {
        bail!("Threshold must be between 0 and 1, got {}", value);
    }

    let response: ThresholdResponse = client
        .post("api/settings/threshold", &ThresholdRequest { threshold: value })
        .await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            print_success(&format!("Stored threshold {}", format_probability(value)));
            if response.source != "metadata:user" {
                print_warning(&format!(
                    "Effective threshold is {} from {}, which takes precedence",
                    format_probability(response.threshold),
                    response.source
                ));
            }
        }
    }

    Ok(())
}
