//! # PII Sentinel Core
//!
//! A PII (Personally Identifiable Information) detection orchestration
//! engine: given text and a per-request configuration snapshot, it
//! dispatches to multiple detector families in parallel, resolves
//! overlapping/duplicate/conflicting detections into one coherent entity
//! list, and applies per-type thresholds and enable/disable policy.
//!
//! ## Pipeline
//!
//! ```text
//! text -> Orchestrator -> {TokenTagger, SpanRecognizer, PatternMatcher} -> Merger -> Post-filter -> Masking -> entities
//! ```
//!
//! The RPC transport, the ML inference runtimes, and the backing
//! configuration store's persistence layer are external collaborators;
//! this crate owns the orchestration, merging, conflict resolution, and
//! masking logic around them, plus two concrete `ConfigStore`
//! implementations and a CLI front-end for offline use.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![warn(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod boot;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod conflict;
pub mod detect;
pub mod entity;
pub mod error;
pub mod io;
pub mod mask;
pub mod merge;
pub mod orchestrator;
pub mod storage;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

// Re-export the data model
pub use entity::{Entity, Source, TypeTag, WireEntity};

// Re-export boot-time immutable configuration
pub use boot::BootConfig;

// Re-export per-request configuration
pub use config::{ConfigGate, ConfigSnapshot, ConfigStore, DetectorScope, GlobalSettings, PerTypeConfig};

// Re-export chunking types
pub use chunking::{Chunk, ChunkParams, Chunker, SemanticChunker, default_chunker};

// Re-export the detector contract and adapters
pub use detect::{Detector, PatternMatcherAdapter, SpanRecognizerAdapter, TokenTaggerAdapter};

// Re-export the orchestrator, the crate's single entry point
pub use orchestrator::{Deadline, DetectOutcome, Orchestrator};

// Re-export storage backends
pub use storage::{DEFAULT_DB_PATH, InMemoryConfigStore, SqliteConfigStore};

// Re-export CLI types
pub use cli::{Cli, Commands, OutputFormat};
