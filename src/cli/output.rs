//! Output formatting for CLI commands.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::entity::WireEntity;
use crate::orchestrator::DetectOutcome;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
    /// Newline-delimited JSON (NDJSON) for streaming.
    Ndjson,
}

impl OutputFormat {
    /// Parses a format from a string, defaulting to `Text` for anything
    /// unrecognized.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "ndjson" | "jsonl" | "stream" => Self::Ndjson,
            _ => Self::Text,
        }
    }

    /// Whether this format is a streaming format.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        matches!(self, Self::Ndjson)
    }
}

/// One line of NDJSON streaming output.
#[derive(Debug, Clone, Serialize)]
pub struct StreamUpdateLine {
    /// Index of the chunk this update covers.
    pub chunk_index: u32,
    /// Total number of chunks for this request.
    pub total_chunks: u32,
    /// Progress through the request, in percent.
    pub progress_percent: f32,
    /// Entities found within this chunk.
    pub entities_in_this_chunk: Vec<WireEntity>,
    /// Whether this is the final update.
    pub r#final: bool,
    /// Present only on the final update.
    pub masked_text: Option<String>,
    /// Present only on the final update.
    pub summary: Option<BTreeMap<String, usize>>,
}

/// Renders a [`DetectOutcome`] for the `detect` subcommand.
#[must_use]
pub fn format_detect_result(outcome: &DetectOutcome, format: OutputFormat) -> String {
    let wire_entities: Vec<WireEntity> = outcome.entities.iter().map(|e| WireEntity::from_entity(e, e.r#type.as_str())).collect();

    match format {
        OutputFormat::Text => format_detect_text(outcome),
        OutputFormat::Json | OutputFormat::Ndjson => {
            #[derive(Serialize)]
            struct DetectResponse<'a> {
                entities: &'a [WireEntity],
                summary: &'a BTreeMap<String, usize>,
                masked_text: &'a str,
            }
            format_json(&DetectResponse {
                entities: &wire_entities,
                summary: &outcome.summary,
                masked_text: &outcome.masked_text,
            })
        }
    }
}

fn format_detect_text(outcome: &DetectOutcome) -> String {
    let mut out = String::new();
    if outcome.entities.is_empty() {
        out.push_str("No entities detected.\n");
    } else {
        let _ = writeln!(out, "Detected {} entities:", outcome.entities.len());
        for e in &outcome.entities {
            let _ = writeln!(out, "  {:<20} [{:>5}, {:>5}) score={:.2} {:?}", e.r#type.as_str(), e.start, e.end, e.score, e.text);
        }
    }
    out.push('\n');
    out.push_str("Summary:\n");
    if outcome.summary.is_empty() {
        out.push_str("  (none)\n");
    } else {
        for (tag, count) in &outcome.summary {
            let _ = writeln!(out, "  {tag}: {count}");
        }
    }
    out.push('\n');
    let _ = writeln!(out, "Masked: {}", outcome.masked_text);
    if !outcome.failed_detectors.is_empty() {
        let _ = writeln!(out, "\nWarning: detector(s) failed this request: {:?}", outcome.failed_detectors);
    }
    out
}

/// Formats a single streaming update line as NDJSON.
#[must_use]
pub fn format_stream_update(update: &StreamUpdateLine) -> String {
    serde_json::to_string(update).unwrap_or_else(|_| "{}".to_string())
}

/// Formats an error for output.
#[must_use]
pub fn format_error(error: &crate::error::Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json | OutputFormat::Ndjson => {
            let (error_type, suggestion) = error_details(error);
            let json = serde_json::json!({
                "success": false,
                "error": {
                    "type": error_type,
                    "message": error.to_string(),
                    "suggestion": suggestion,
                }
            });
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| "{}".to_string())
        }
    }
}

const fn error_details(error: &crate::error::Error) -> (&'static str, Option<&'static str>) {
    use crate::error::Error;

    match error {
        Error::InvalidInput { .. } => ("InvalidInput", Some("Check the input text size and encoding")),
        Error::ConfigUnavailable(_) => ("ConfigUnavailable", Some("Verify --config-db points at a reachable store")),
        Error::ChunkingUnavailable(_) => ("ChunkingUnavailable", None),
        Error::Internal { .. } => ("Internal", Some("All detectors failed; check logs for detector-level errors")),
        Error::Cancelled => ("Cancelled", None),
        Error::Merge(_) => ("Merge", None),
        Error::Io(_) => ("Io", Some("Verify the input file path exists and is readable")),
    }
}

fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_formats() {
        assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("ndjson"), OutputFormat::Ndjson);
        assert_eq!(OutputFormat::parse("stream"), OutputFormat::Ndjson);
        assert_eq!(OutputFormat::parse("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("bogus"), OutputFormat::Text);
    }

    #[test]
    fn ndjson_is_streaming() {
        assert!(OutputFormat::Ndjson.is_streaming());
        assert!(!OutputFormat::Json.is_streaming());
    }

    #[test]
    fn empty_outcome_renders_no_entities_message() {
        let outcome = DetectOutcome::empty();
        let text = format_detect_result(&outcome, OutputFormat::Text);
        assert!(text.contains("No entities detected"));
    }

    #[test]
    fn detect_result_json_round_trips_structure() {
        let outcome = DetectOutcome::empty();
        let json = format_detect_result(&outcome, OutputFormat::Json);
        assert!(json.contains("\"entities\""));
        assert!(json.contains("\"masked_text\""));
    }
}
