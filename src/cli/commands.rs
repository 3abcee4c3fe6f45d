//! CLI command implementations.

use std::io::Read as _;
use std::sync::Arc;

use crate::boot::BootConfig;
use crate::chunking::{ChunkParams, Chunker, SemanticChunker};
use crate::cli::output::{OutputFormat, StreamUpdateLine, format_detect_result, format_stream_update};
use crate::cli::parser::{Cli, Commands};
use crate::config::{ConfigSnapshot, DetectorScope, GlobalSettings, PerTypeConfig};
use crate::detect::pattern::{BootPatternModel, PatternMatcherAdapter};
use crate::detect::span_recognizer::{NullSpanRecognizerModel, SpanRecognizerAdapter};
use crate::detect::token_tagger::{NullTokenTaggerModel, TokenTaggerAdapter};
use crate::entity::WireEntity;
use crate::error::{IoError, Result};
use crate::orchestrator::Orchestrator;
use crate::storage::{InMemoryConfigStore, SqliteConfigStore};

/// Executes the CLI command.
///
/// # Errors
///
/// Returns an error if reading input fails, the configuration store is
/// unreachable, or detection itself fails.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    match &cli.command {
        Commands::Detect { file, text, stdin, threshold } => cmd_detect(cli, file.as_deref(), text.as_deref(), *stdin, *threshold, format),
        Commands::StreamDetect { file, text, stdin, threshold } => cmd_stream_detect(cli, file.as_deref(), text.as_deref(), *stdin, *threshold, format),
    }
}

fn read_input(file: Option<&std::path::Path>, text: Option<&str>, stdin: bool) -> Result<String> {
    if let Some(path) = file {
        return crate::io::read_file(path);
    }
    if let Some(t) = text {
        return Ok(t.to_string());
    }
    if stdin {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).map_err(|e| IoError::ReadFailed {
            path: "<stdin>".to_string(),
            reason: e.to_string(),
        })?;
        return Ok(buf);
    }
    Ok(String::new())
}

fn build_orchestrator(cli: &Cli) -> Result<Orchestrator> {
    let boot = BootConfig::load_default()?;
    let chunker: Arc<dyn Chunker> = Arc::new(SemanticChunker::new());
    let params = ChunkParams::typical();

    let token_tagger = TokenTaggerAdapter::new(Box::new(NullTokenTaggerModel), Arc::clone(&chunker), params);
    let span_recognizer = SpanRecognizerAdapter::new(Box::new(NullSpanRecognizerModel), chunker, params, Arc::clone(&boot));
    let pattern = PatternMatcherAdapter::new(Box::new(BootPatternModel::new(Arc::clone(&boot))));

    let detectors: Vec<Box<dyn crate::detect::Detector>> = vec![Box::new(token_tagger), Box::new(span_recognizer), Box::new(pattern)];

    let db_path = cli.get_config_db_path();
    if db_path.exists() {
        let store = SqliteConfigStore::open(&db_path)?;
        Ok(Orchestrator::with_fallback(detectors, Arc::new(store), default_snapshot(&boot)))
    } else {
        let store = InMemoryConfigStore::new(default_snapshot(&boot));
        Ok(Orchestrator::new(detectors, Arc::new(store)))
    }
}

/// Builds a permissive default configuration enabling every boot-time
/// catalogue type, used when no real configuration store is wired in
/// (the CLI's offline mode).
fn default_snapshot(boot: &BootConfig) -> ConfigSnapshot {
    let mut per_type = std::collections::HashMap::new();
    for pattern in &boot.patterns {
        per_type.insert(
            pattern.type_tag.clone(),
            PerTypeConfig {
                enabled: true,
                threshold: 0.0,
                detector: DetectorScope::All,
                detector_label: pattern.type_tag.as_str().to_lowercase(),
                category: category_for(pattern.type_tag.as_str()),
            },
        );
    }
    ConfigSnapshot {
        global: GlobalSettings::default(),
        per_type,
    }
}

fn category_for(type_tag: &str) -> String {
    match type_tag {
        "CREDIT_CARD" | "BANK_ACCOUNT_NUMBER" | "AVS_NUMBER" => "FINANCIAL",
        "SSN" | "NATIONAL_ID" => "IDENTITY",
        "EMAIL" | "PHONE_NUMBER" => "CONTACT",
        _ => "DIGITAL",
    }
    .to_string()
}

fn cmd_detect(cli: &Cli, file: Option<&std::path::Path>, text: Option<&str>, stdin: bool, threshold: Option<f32>, format: OutputFormat) -> Result<String> {
    let input = read_input(file, text, stdin)?;
    let orchestrator = build_orchestrator(cli)?;
    let outcome = orchestrator.detect(&input, threshold, None, None)?;
    Ok(format_detect_result(&outcome, format) + "\n")
}

/// Streams one `Update` per chunk boundary the Chunker+Stitcher would
/// use, the final update carrying the same `masked_text`/`summary` the
/// unary path returns.
///
/// The underlying detection itself still runs once, as one unary
/// request; this splits its already-final entity list across the
/// chunker's boundaries to report progress, rather than re-running
/// detection per chunk.
fn cmd_stream_detect(cli: &Cli, file: Option<&std::path::Path>, text: Option<&str>, stdin: bool, threshold: Option<f32>, _format: OutputFormat) -> Result<String> {
    let input = read_input(file, text, stdin)?;
    let orchestrator = build_orchestrator(cli)?;
    let outcome = orchestrator.detect(&input, threshold, None, None)?;

    let normalized = crate::io::normalize_nfc(&input);
    let chunks = if normalized.is_empty() {
        Vec::new()
    } else {
        SemanticChunker::new().chunk(&normalized, ChunkParams::typical())?
    };
    let total_chunks = chunks.len().max(1) as u32;

    let mut lines = String::new();
    if chunks.is_empty() {
        let update = StreamUpdateLine {
            chunk_index: 0,
            total_chunks: 1,
            progress_percent: 100.0,
            entities_in_this_chunk: Vec::new(),
            r#final: true,
            masked_text: Some(outcome.masked_text.clone()),
            summary: Some(outcome.summary.clone()),
        };
        lines.push_str(&format_stream_update(&update));
        lines.push('\n');
        return Ok(lines);
    }

    for (idx, chunk) in chunks.iter().enumerate() {
        let is_final = idx + 1 == chunks.len();
        let entities_in_chunk: Vec<WireEntity> = outcome
            .entities
            .iter()
            .filter(|e| e.start >= chunk.start && e.start < chunk.end)
            .map(|e| WireEntity::from_entity(e, e.r#type.as_str()))
            .collect();

        let update = StreamUpdateLine {
            chunk_index: idx as u32,
            total_chunks,
            progress_percent: 100.0 * (idx + 1) as f32 / total_chunks as f32,
            entities_in_this_chunk: entities_in_chunk,
            r#final: is_final,
            masked_text: is_final.then(|| outcome.masked_text.clone()),
            summary: is_final.then(|| outcome.summary.clone()),
        };
        lines.push_str(&format_stream_update(&update));
        lines.push('\n');
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with(command: Commands) -> Cli {
        Cli {
            config_db: Some(std::path::PathBuf::from("/nonexistent/pii-sentinel-test.db")),
            verbose: false,
            format: "text".to_string(),
            command,
        }
    }

    #[test]
    fn detect_command_finds_email() {
        let cli = cli_with(Commands::Detect {
            file: None,
            text: Some("Contact john.doe@example.com now".to_string()),
            stdin: false,
            threshold: None,
        });
        let output = execute(&cli).unwrap();
        assert!(output.contains("EMAIL"));
        assert!(output.contains("Masked: Contact [EMAIL] now"));
    }

    #[test]
    fn detect_command_on_empty_input_reports_no_entities() {
        let cli = cli_with(Commands::Detect {
            file: None,
            text: Some(String::new()),
            stdin: false,
            threshold: None,
        });
        let output = execute(&cli).unwrap();
        assert!(output.contains("No entities detected"));
    }

    #[test]
    fn stream_detect_emits_one_final_ndjson_line() {
        let cli = cli_with(Commands::StreamDetect {
            file: None,
            text: Some("Contact john.doe@example.com now".to_string()),
            stdin: false,
            threshold: None,
        });
        let output = execute(&cli).unwrap();
        assert_eq!(output.lines().count(), 1);
        assert!(output.contains("\"final\":true"));
    }

    #[test]
    fn stream_detect_emits_one_update_per_chunk_with_final_last() {
        let long_text = "Reach me at a@b.com. ".repeat(2000);
        let cli = cli_with(Commands::StreamDetect {
            file: None,
            text: Some(long_text),
            stdin: false,
            threshold: None,
        });
        let output = execute(&cli).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines.len() > 1, "long input should stream more than one chunk update");
        for line in &lines[..lines.len() - 1] {
            assert!(line.contains("\"final\":false"));
        }
        assert!(lines.last().unwrap().contains("\"final\":true"));
    }
}
