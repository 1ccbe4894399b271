//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use batchread_core::{FileSummary, GroupId};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::{CliError, CliResult};
use crate::fs_backend::ReadOutput;

const PREVIEW_CHARS: usize = 48;

/// One line of read-session output.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub(crate) struct EventRecord {
    pub(crate) event: &'static str,
    pub(crate) group_id: GroupId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) file: Option<FileSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) files: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) loaded: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) result: Option<ResultSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) load_time_ms: Option<i64>,
}

impl EventRecord {
    pub(crate) const fn new(event: &'static str, group_id: GroupId) -> Self {
        Self {
            event,
            group_id,
            file: None,
            files: None,
            loaded: None,
            total: None,
            result: None,
            error: None,
            load_time_ms: None,
        }
    }
}

/// Short description of a decoded read result.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub(crate) struct ResultSummary {
    pub(crate) mode: String,
    pub(crate) length: usize,
    pub(crate) preview: String,
}

impl ResultSummary {
    pub(crate) fn describe(mode: &str, output: &ReadOutput) -> Self {
        let preview = match output {
            ReadOutput::Bytes(bytes) => bytes
                .iter()
                .take(PREVIEW_CHARS / 2)
                .map(|byte| format!("{byte:02x}"))
                .collect(),
            ReadOutput::Text(text) => text
                .chars()
                .take(PREVIEW_CHARS)
                .map(|ch| if ch.is_control() { '.' } else { ch })
                .collect(),
        };
        Self {
            mode: mode.to_string(),
            length: output.len(),
            preview,
        }
    }
}

pub(crate) fn render_event(record: &EventRecord, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let text = serde_json::to_string(record)
                .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
            println!("{text}");
        }
        OutputFormat::Table => println!("{}", event_line(record)),
    }
    Ok(())
}

pub(crate) fn event_line(record: &EventRecord) -> String {
    match record.event {
        "groupstart" => format!(
            "Group: {} ({} files)",
            record.group_id,
            record.files.unwrap_or_default()
        ),
        "groupend" => format!(
            "Group: {} done (Time to load: {}ms)",
            record.group_id,
            record.load_time_ms.unwrap_or_default()
        ),
        event => {
            let name = record.file.as_ref().map_or("<unknown>", |file| file.name.as_str());
            let id = record.file.as_ref().map_or(0, |file| file.file_id.get());
            let mut line = format!("  #{id:<4} {event:<9} {name}");
            if let (Some(loaded), Some(total)) = (record.loaded, record.total) {
                line.push_str(&format!(" {}", percent(loaded, total)));
            }
            if let Some(result) = &record.result {
                line.push_str(&format!(
                    " [{} len={}] {}",
                    result.mode, result.length, result.preview
                ));
            }
            if let Some(error) = &record.error {
                line.push_str(&format!(" error: {error}"));
            }
            line
        }
    }
}

pub(crate) fn render_files(files: &[FileSummary], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(files)
                .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
            println!("{text}");
        }
        OutputFormat::Table => {
            println!("{:<6} {:<24} {:>12} NAME", "ID", "TYPE", "SIZE");
            for file in files {
                let content_type = if file.content_type.is_empty() {
                    "-"
                } else {
                    file.content_type.as_str()
                };
                println!(
                    "{:<6} {:<24} {:>12} {}",
                    file.file_id, content_type, file.extra.pretty_size, file.name
                );
            }
        }
    }
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn percent(loaded: u64, total: u64) -> String {
    if total == 0 {
        return "100%".to_string();
    }
    format!("{:.0}%", loaded as f64 * 100.0 / total as f64)
}
