//! `debrief apply`: run tool output commands against a feature collection.

use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::{read_collection, read_json, read_state};
use crate::cli::output::{
    output_json, print_error, print_header, print_hint, print_kv, print_success, print_table,
    OutputMode,
};
use crate::init::AppContext;
use crate::models::{FeatureCollection, ImagePayload};
use crate::services::CommandBatchOutcome;
use crate::state::{DisplayEvent, StateProvider, DEFAULT_EDITOR};

pub struct ApplyArgs<'a> {
    pub commands: &'a Path,
    pub collection: Option<&'a Path>,
    pub state: Option<&'a Path>,
    pub output: Option<&'a Path>,
    pub image_dir: Option<&'a Path>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplyReport {
    #[serde(flatten)]
    outcome: CommandBatchOutcome,
    events: Vec<DisplayEvent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images_written: Vec<PathBuf>,
}

pub async fn handle_apply(ctx: &AppContext, args: ApplyArgs<'_>, mode: OutputMode) -> Result<()> {
    let raw: Value = read_json(args.commands)?;

    if let Some(path) = args.state {
        ctx.state.insert_editor(DEFAULT_EDITOR, read_state(path)?);
    }
    let start = match args.collection {
        Some(path) => read_collection(path)?,
        None => ctx.state.feature_collection().unwrap_or_default(),
    };

    let outcome = ctx.command_processor.process_values(&raw, &start).await;
    ctx.state
        .set_feature_collection(outcome.feature_collection.clone());

    let events = ctx.state.take_events();
    let images_written = match args.image_dir {
        Some(dir) => write_images(dir, &events)?,
        None => Vec::new(),
    };

    if let Some(path) = args.output {
        write_collection(path, &outcome.feature_collection)?;
    }

    let report = ApplyReport {
        outcome,
        events,
        images_written,
    };

    if mode == OutputMode::Json {
        output_json(&report);
        return Ok(());
    }

    print_header("Command results");
    let rows = report
        .outcome
        .results
        .iter()
        .map(|r| {
            vec![
                r.metadata.operation_type.clone(),
                if r.success { "ok" } else { "failed" }.to_string(),
                r.metadata
                    .features_affected
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                r.error.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["Command", "Status", "Affected", "Error"], rows);

    for event in &report.events {
        print_event(event);
    }
    for path in &report.images_written {
        print_kv("Image written", &path.display().to_string());
    }

    let count = report.outcome.feature_collection.len();
    if report.outcome.success {
        print_success(&format!("Collection now holds {} feature(s)", count));
    } else if report.outcome.rolled_back {
        print_error(&format!("Batch failed; rolled back to {} feature(s)", count));
    } else {
        print_error(&format!("Batch failed; collection holds {} feature(s)", count));
    }
    if let Some(path) = args.output {
        print_hint(&format!("Collection written to {}", path.display()));
    }

    Ok(())
}

fn print_event(event: &DisplayEvent) {
    match event {
        DisplayEvent::Text { text } => print_kv("text", text),
        DisplayEvent::Data { data } => print_kv("data", &data.to_string()),
        DisplayEvent::Image { image } => print_kv(
            "image",
            image.title.as_deref().unwrap_or(image.media_type.as_str()),
        ),
        DisplayEvent::Log { message, level } => print_kv(&format!("log/{:?}", level), message),
    }
}

fn write_collection(path: &Path, fc: &FeatureCollection) -> Result<()> {
    let json = serde_json::to_string_pretty(fc)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Decode every displayed image into `dir`, returning the written paths.
pub fn write_images(dir: &Path, events: &[DisplayEvent]) -> Result<Vec<PathBuf>> {
    let images: Vec<&ImagePayload> = events
        .iter()
        .filter_map(|e| match e {
            DisplayEvent::Image { image } => Some(image),
            _ => None,
        })
        .collect();
    if images.is_empty() {
        return Ok(Vec::new());
    }

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut written = Vec::with_capacity(images.len());
    for (index, image) in images.into_iter().enumerate() {
        let bytes = general_purpose::STANDARD
            .decode(image.data.trim())
            .with_context(|| format!("Image {} is not valid base64", index + 1))?;
        let path = dir.join(format!("image-{}.{}", index + 1, extension(&image.media_type)));
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

fn extension(media_type: &str) -> &str {
    match media_type {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/svg+xml" => "svg",
        "image/webp" => "webp",
        _ => "bin",
    }
}
