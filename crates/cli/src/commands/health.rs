//! Service health CLI command

use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use tabled::Tabled;

use crate::client::{ApiClient, HealthResponse, ReadinessResponse};
use crate::output::{color_status, print_json, print_table, print_warning, OutputFormat};

/// Row for component health
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Show component health and readiness of the service
pub async fn show(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let (_, health): (u16, HealthResponse) = client.get_probe("healthz").await?;
    let (_, readiness): (u16, ReadinessResponse) = client.get_probe("readyz").await?;

    match format {
        OutputFormat::Json => print_json(&json!({ "health": health, "readiness": readiness }))?,
        OutputFormat::Table => {
            println!("{} {}", "Service:".bold(), color_status(&health.status));
            let ready = if readiness.ready { "ready" } else { "not ready" };
            println!("{} {}", "Readiness:".bold(), color_status(ready));
            if let Some(version) = &readiness.model_version {
                println!("{} {}", "Model:".bold(), version);
            }
            if let Some(reason) = &readiness.reason {
                print_warning(reason);
            }
            println!();

            let rows = health
                .components
                .iter()
                .map(|(name, c)| ComponentRow {
                    name: name.clone(),
                    status: color_status(&c.status),
                    message: c.message.clone().unwrap_or_default(),
                })
                .collect();
            print_table(rows, "No components registered");
        }
    }

    Ok(())
}
