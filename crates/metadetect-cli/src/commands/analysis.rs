use anyhow::{Context, Result};
use metadetect_core::models::AnalysisRecord;
use metadetect_services::manifest_summary;
use uuid::Uuid;

use super::print_json;
use crate::truncate_string;
use crate::wiring::App;

pub async fn analyze(app: &App, image_id: Uuid) -> Result<()> {
    let started = app.orchestrator.submit(image_id).await?;
    let status = app.orchestrator.get_status(started.analysis_id).await?;
    print_json(&status)
}

pub async fn status(app: &App, analysis_id: Uuid) -> Result<()> {
    print_json(&app.orchestrator.get_status(analysis_id).await?)
}

pub async fn manifest(app: &App, analysis_id: Uuid, summary: bool) -> Result<()> {
    let manifest = app.orchestrator.get_manifest(analysis_id).await?;
    if summary {
        let active = manifest_summary(&manifest.manifest_json)
            .context("Failed to read manifest summary")?;
        print_json(&active)
    } else {
        println!("{}", manifest.manifest_json);
        Ok(())
    }
}

pub async fn compare(app: &App, left: Uuid, right: Uuid) -> Result<()> {
    print_json(&app.orchestrator.compare(left, right).await?)
}

pub async fn history(app: &App, image_id: Uuid, latest: bool) -> Result<()> {
    let records = if latest {
        vec![app.orchestrator.latest_for_image(image_id).await?]
    } else {
        app.orchestrator.list_for_image(image_id).await?
    };

    if records.is_empty() {
        println!("No analyses found.");
        return Ok(());
    }

    println!("{:<36}  {:<8}  {:<25}  DETAILS", "ID", "STATUS", "CREATED");
    for record in &records {
        println!("{}", history_row(record));
    }
    Ok(())
}

fn history_row(record: &AnalysisRecord) -> String {
    let details = record
        .details
        .as_deref()
        .map(|details| truncate_string(&details.replace('\n', " "), 60))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<36}  {:<8}  {:<25}  {}",
        record.id,
        record.status.to_string(),
        record.created_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        details
    )
}
