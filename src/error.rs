//! Error types for the detection orchestration engine.
//!
//! This module provides a layered error hierarchy using `thiserror`,
//! grouping failures by the pipeline stage that produced them: config
//! fetch, chunking, detector execution, and the orchestrator itself.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type surfaced by the orchestrator.
///
/// Detector-level failures are contained inside [`crate::orchestrator`] and
/// never reach this type directly unless every detector in a request fails,
/// in which case they are folded into [`Error::Internal`]. No variant here
/// ever carries a substring of request input text.
#[derive(Error, Debug)]
pub enum Error {
    /// The request text was empty beyond what's handled internally, or
    /// exceeded the externally enforced maximum size.
    #[error("invalid input: {reason} (size: {size})")]
    InvalidInput {
        /// Which rule was violated.
        reason: String,
        /// The offending size, in bytes.
        size: usize,
    },

    /// The configuration store could not be reached and no compile-time
    /// fallback was configured.
    #[error("configuration unavailable: {0}")]
    ConfigUnavailable(#[from] ConfigError),

    /// The semantic chunker failed to initialize. Fatal at boot; never
    /// recovered at request time.
    #[error("chunking unavailable: {0}")]
    ChunkingUnavailable(#[from] ChunkingError),

    /// Every active detector failed for this request.
    #[error("internal error (request {request_id})")]
    Internal {
        /// Correlation id for structured logs.
        request_id: String,
    },

    /// The request deadline elapsed, or the client disconnected.
    #[error("request cancelled")]
    Cancelled,

    /// A programmer error inside the merger or conflict resolver. These
    /// are never swallowed (spec: "Merger and conflict resolver errors
    /// are programmer errors and must not be swallowed").
    #[error("merge error: {0}")]
    Merge(#[from] MergeError),

    /// Reading the CLI's input file failed.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

/// Errors from the CLI's file-loading path (the `ConfigStore`'s own
/// persistence errors are reported separately via [`ConfigError`]).
#[derive(Error, Debug)]
pub enum IoError {
    /// The requested input file does not exist.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be read (permissions, transient I/O failure).
    #[error("failed to read {path}: {reason}")]
    ReadFailed {
        /// Path that failed to read.
        path: String,
        /// Non-PII description of the underlying OS error.
        reason: String,
    },

    /// Memory-mapping the file failed.
    #[error("failed to mmap {path}: {reason}")]
    MmapFailed {
        /// Path that failed to map.
        path: String,
        /// Non-PII description of the underlying OS error.
        reason: String,
    },
}

/// Errors from the per-request [`crate::config::ConfigGate`] fetch.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The backing store did not respond or returned a transport failure.
    #[error("config store unreachable: {0}")]
    StoreUnreachable(String),

    /// The store responded but the payload could not be decoded into a
    /// [`crate::config::ConfigSnapshot`].
    #[error("malformed config snapshot: {0}")]
    Malformed(String),
}

/// Errors from chunk construction (the Chunker+Stitcher component).
#[derive(Error, Debug)]
pub enum ChunkingError {
    /// `chunk_size` was zero or otherwise nonsensical.
    #[error("invalid chunk configuration: {reason}")]
    InvalidConfig {
        /// Reason the configuration is invalid.
        reason: String,
    },

    /// `overlap` was not smaller than `chunk_size`.
    #[error("overlap {overlap} must be less than chunk size {size}")]
    OverlapTooLarge {
        /// Configured overlap.
        overlap: usize,
        /// Configured chunk size.
        size: usize,
    },

    /// Requested chunk size exceeds the hard ceiling.
    #[error("chunk size {size} exceeds maximum {max}")]
    ChunkTooLarge {
        /// Requested chunk size.
        size: usize,
        /// Hard ceiling.
        max: usize,
    },

    /// The semantic boundary scanner could not make progress on the input
    /// (e.g. a boundary policy that cannot locate any valid split point).
    #[error("semantic chunker failed to initialize: {reason}")]
    BoundaryScannerUnavailable {
        /// Reason initialization failed.
        reason: String,
    },
}

/// Errors surfaced by a single detector adapter invocation.
///
/// These never propagate out of the orchestrator directly: a detector
/// that returns either variant contributes an empty entity list to the
/// request, and the error is recorded for logging only.
#[derive(Error, Debug)]
pub enum DetectorError {
    /// The detector's backing model is not loaded. Contained by the
    /// orchestrator; not surfaced to the caller.
    #[error("detector unavailable: {detector}")]
    Unavailable {
        /// Name of the detector family.
        detector: &'static str,
    },

    /// The detector raised during a request (inference failure, a chunk
    /// that could not be processed, etc). Contained and logged at error
    /// level; not surfaced unless every detector fails.
    #[error("detector internal error in {detector}: {message}")]
    Internal {
        /// Name of the detector family.
        detector: &'static str,
        /// Non-PII description of the failure.
        message: String,
    },

    /// Chunking failed for this detector's input.
    #[error("chunking failed: {0}")]
    Chunking(#[from] ChunkingError),
}

/// Errors from the merger or conflict resolver. These indicate a bug in
/// the core, not a transient condition, and are never silently dropped.
#[derive(Error, Debug)]
pub enum MergeError {
    /// An entity with `start >= end` reached the merger; upstream
    /// adapters must never produce this.
    #[error("invalid span: start {start} >= end {end}")]
    InvalidSpan {
        /// The offending start offset.
        start: usize,
        /// The offending end offset.
        end: usize,
    },
}

impl From<DetectorError> for Error {
    fn from(err: DetectorError) -> Self {
        Self::Internal {
            request_id: err.to_string(),
        }
    }
}
