//! Prediction CLI commands

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Deserialize;
use std::path::Path;
use tabled::Tabled;

use crate::client::{ApiClient, BatchRequest, BatchResponse, PredictRequest, PredictionResult};
use crate::output::{
    color_label, color_priority, color_probability, format_change, format_probability,
    print_error, print_json, print_table, print_warning, FieldRow, OutputFormat,
};

/// Row for the contributions table
#[derive(Tabled)]
struct ContributionRow {
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Contribution")]
    contribution: String,
    #[tabled(rename = "Effect")]
    effect: String,
}

/// Row for the feedback table
#[derive(Tabled)]
struct FeedbackRow {
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Suggested")]
    suggested: String,
    #[tabled(rename = "Change")]
    change: String,
    #[tabled(rename = "Est. Probability")]
    estimated: String,
    #[tabled(rename = "Feasible")]
    feasible: String,
}

/// Row for batch results
#[derive(Tabled)]
struct BatchRow {
    #[tabled(rename = "Student")]
    student_id: String,
    #[tabled(rename = "Course")]
    course_id: String,
    #[tabled(rename = "Result")]
    label: String,
    #[tabled(rename = "Probability")]
    probability: String,
    #[tabled(rename = "Top Suggestion")]
    suggestion: String,
}

/// Predict pass/fail for one student
pub async fn predict(client: &ApiClient, request: PredictRequest, format: OutputFormat) -> Result<()> {
    let result: PredictionResult = client.post("api/predict", &request).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => print_prediction(&result),
    }

    Ok(())
}

fn print_prediction(result: &PredictionResult) {
    println!("{}", "Prediction".bold());
    println!("{}", "=".repeat(60));

    let summary = vec![
        FieldRow::new("Result", color_label(result.predicted_label)),
        FieldRow::new(
            "Probability",
            color_probability(result.probability, result.threshold_used),
        ),
        FieldRow::new(
            "Threshold",
            format!(
                "{} ({})",
                format_probability(result.threshold_used),
                result.threshold_source
            ),
        ),
        FieldRow::new("Model", result.model_version.clone()),
    ];
    print_table(summary, "No prediction returned");

    for reason in &result.suspicious_reasons {
        print_warning(&format!("Suspicious input: {}", reason));
    }

    println!("\n{}", "Top contributions".bold());
    let contributions = result
        .explanation
        .contributions
        .iter()
        .map(|c| ContributionRow {
            feature: c.feature.clone(),
            value: format!("{:.2}", c.value),
            contribution: format_change(c.contribution),
            effect: c.effect.clone(),
        })
        .collect();
    print_table(contributions, "No contributions reported");

    if result.feedback.is_empty() {
        return;
    }

    println!("\n{}", "Suggestions".bold());
    let feedback = result
        .feedback
        .iter()
        .map(|s| FeedbackRow {
            priority: color_priority(&s.priority),
            feature: s.feature.clone(),
            current: format!("{:.2}", s.current_value),
            suggested: format!("{:.2}", s.suggested_value),
            change: format_change(s.change),
            estimated: format_probability(s.estimated_probability),
            feasible: if s.feasible { "yes" } else { "no" }.to_string(),
        })
        .collect();
    print_table(feedback, "No suggestions");
}

/// Accepted batch file layouts: a bare array of records or `{"items": [...]}`
#[derive(Deserialize)]
#[serde(untagged)]
enum BatchFile {
    Items(Vec<serde_json::Value>),
    Wrapped { items: Vec<serde_json::Value> },
}

/// Read batch records from a JSON file
pub fn read_batch_file(path: &Path) -> Result<Vec<serde_json::Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch file {}", path.display()))?;
    let file: BatchFile =
        serde_json::from_str(&content).context("Batch file must be a JSON array or {\"items\": [...]}")?;
    Ok(match file {
        BatchFile::Wrapped { items } | BatchFile::Items(items) => items,
    })
}

/// Predict for every record in a JSON file (admin)
pub async fn predict_batch(
    client: &ApiClient,
    file: &Path,
    threshold: Option<f64>,
    format: OutputFormat,
) -> Result<()> {
    let items = read_batch_file(file)?;
    let request = BatchRequest { items, threshold };
    let response: BatchResponse = client.post("api/predict_batch", &request).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            let mut failures = Vec::new();
            let rows: Vec<BatchRow> = response
                .results
                .iter()
                .map(|r| {
                    let id = |v: Option<i64>| v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
                    match (&r.result, &r.error) {
                        (Some(result), _) => BatchRow {
                            student_id: id(r.student_id),
                            course_id: id(r.course_id),
                            label: color_label(result.predicted_label),
                            probability: color_probability(result.probability, result.threshold_used),
                            suggestion: result
                                .feedback
                                .first()
                                .map(|s| format!("{} -> {:.2}", s.feature, s.suggested_value))
                                .unwrap_or_else(|| "-".to_string()),
                        },
                        (None, error) => {
                            failures.push((id(r.student_id), error.clone().unwrap_or_default()));
                            BatchRow {
                                student_id: id(r.student_id),
                                course_id: id(r.course_id),
                                label: "ERROR".red().to_string(),
                                probability: "-".to_string(),
                                suggestion: "-".to_string(),
                            }
                        }
                    }
                })
                .collect();

            print_table(rows, "No records in batch");
            for (student, error) in failures {
                print_error(&format!("Student {}: {}", student, error));
            }
            println!("\nTotal: {} records", response.count);
        }
    }

    Ok(())
}
