//! File reading for the CLI's offline `detect --file` path.
//!
//! Mirrors the size-adaptive strategy a production ingestion surface
//! would use: small files are read directly, large ones memory-mapped.
//! The detection core itself only ever sees a `&str`; this module's
//! concern is getting bytes off disk efficiently, not detection.

// Memory mapping requires unsafe but is well-documented and safe for read-only access.
#![allow(unsafe_code)]

use std::fs::File;
use std::io::Read as _;
use std::path::Path;

use memmap2::Mmap;

use crate::error::{IoError, Result};

/// Above this size, prefer memory mapping over a direct read.
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Hard ceiling on input file size; larger files are rejected outright
/// rather than risking unbounded memory use (the core's own oversized-
/// input check applies on top of this).
const MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024;

/// Opens and reads an input file, choosing mmap or a direct read based
/// on size.
///
/// # Errors
///
/// Returns [`IoError`] if the file is missing, too large, unreadable, or
/// not valid UTF-8.
pub fn read_file(path: impl AsRef<Path>) -> Result<String> {
    let path_ref = path.as_ref();
    let path_str = path_ref.to_string_lossy().to_string();

    if !path_ref.exists() {
        return Err(IoError::FileNotFound { path: path_str }.into());
    }

    let file = File::open(path_ref).map_err(|e| IoError::ReadFailed {
        path: path_str.clone(),
        reason: e.to_string(),
    })?;

    let size = file
        .metadata()
        .map_err(|e| IoError::ReadFailed {
            path: path_str.clone(),
            reason: e.to_string(),
        })?
        .len();

    if size > MAX_FILE_SIZE {
        return Err(IoError::ReadFailed {
            path: path_str,
            reason: format!("file too large: {size} bytes (max: {MAX_FILE_SIZE} bytes)"),
        }
        .into());
    }

    let bytes = if size >= MMAP_THRESHOLD {
        read_mmap(&file, &path_str)?
    } else {
        read_direct(file, &path_str)?
    };

    String::from_utf8(bytes).map_err(|e| {
        IoError::ReadFailed {
            path: path_str,
            reason: format!("invalid UTF-8: {e}"),
        }
        .into()
    })
}

fn read_mmap(file: &File, path: &str) -> Result<Vec<u8>> {
    // Safety: read-only mapping of a file we just opened; no concurrent
    // writer is expected for an offline CLI input file.
    let mmap = unsafe {
        Mmap::map(file).map_err(|e| IoError::MmapFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })?
    };
    Ok(mmap.to_vec())
}

fn read_direct(mut file: File, path: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).map_err(|e| IoError::ReadFailed {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    Ok(buf)
}
