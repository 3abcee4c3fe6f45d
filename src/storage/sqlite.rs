//! `SQLite`-backed `ConfigStore`.
//!
//! A minimal persistent store: one row of global settings, one row per
//! type tag. Every [`ConfigStore::fetch`] call re-reads both tables —
//! there is no in-process cache here either: the core requires
//! read-through semantics regardless of which store backs it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::Connection;

use crate::config::{ConfigSnapshot, ConfigStore, DetectorScope, GlobalSettings, PerTypeConfig};
use crate::entity::TypeTag;
use crate::error::{ConfigError, Result};

fn scope_to_str(scope: DetectorScope) -> &'static str {
    match scope {
        DetectorScope::MlTagger => "ML_TAGGER",
        DetectorScope::MlRecognizer => "ML_RECOGNIZER",
        DetectorScope::Pattern => "PATTERN",
        DetectorScope::All => "ALL",
    }
}

fn scope_from_str(s: &str) -> DetectorScope {
    match s {
        "ML_TAGGER" => DetectorScope::MlTagger,
        "ML_RECOGNIZER" => DetectorScope::MlRecognizer,
        "PATTERN" => DetectorScope::Pattern,
        _ => DetectorScope::All,
    }
}

/// `SQLite`-backed configuration store.
pub struct SqliteConfigStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteConfigStore {
    /// Opens or creates a database at `path`, creating the schema if
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::Io`] if the database cannot be
    /// opened or the schema cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| crate::error::IoError::ReadFailed {
                path: path.to_string_lossy().to_string(),
                reason: e.to_string(),
            })?;
        }
        let conn = Connection::open(&path).map_err(|e| crate::error::IoError::ReadFailed {
            path: path.to_string_lossy().to_string(),
            reason: e.to_string(),
        })?;
        conn.execute_batch(super::schema::SCHEMA_SQL).map_err(|e| crate::error::IoError::ReadFailed {
            path: path.to_string_lossy().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path),
        })
    }

    /// Opens an in-memory database, mainly for tests.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::Io`] if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| crate::error::IoError::ReadFailed {
            path: ":memory:".to_string(),
            reason: e.to_string(),
        })?;
        conn.execute_batch(super::schema::SCHEMA_SQL).map_err(|e| crate::error::IoError::ReadFailed {
            path: ":memory:".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { conn: Mutex::new(conn), path: None })
    }

    /// The backing file path (`None` for an in-memory store).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Writes global settings, used to seed the store (operator tooling,
    /// tests) — not part of the `ConfigStore` read contract.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::ConfigUnavailable`] if the write
    /// fails.
    pub fn set_global(&self, settings: &GlobalSettings) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            super::schema::UPSERT_GLOBAL_SQL,
            rusqlite::params![f64::from(settings.default_threshold), settings.batch_label_limit as i64],
        )
        .map_err(|e| ConfigError::StoreUnreachable(e.to_string()))?;
        Ok(())
    }

    /// Writes or updates one type's configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::ConfigUnavailable`] if the write
    /// fails.
    pub fn set_type(&self, tag: &TypeTag, cfg: &PerTypeConfig) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            super::schema::UPSERT_TYPE_SQL,
            rusqlite::params![tag.as_str(), i64::from(cfg.enabled), f64::from(cfg.threshold), scope_to_str(cfg.detector), cfg.detector_label, cfg.category],
        )
        .map_err(|e| ConfigError::StoreUnreachable(e.to_string()))?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| ConfigError::StoreUnreachable("sqlite config store mutex poisoned".to_string()).into())
    }
}

impl ConfigStore for SqliteConfigStore {
    fn fetch(&self, scopes: &[DetectorScope]) -> std::result::Result<ConfigSnapshot, ConfigError> {
        let conn = self.conn.lock().map_err(|_| ConfigError::StoreUnreachable("sqlite config store mutex poisoned".to_string()))?;

        let global = conn
            .query_row(super::schema::SELECT_GLOBAL_SQL, [], |row| {
                let threshold: f64 = row.get(0)?;
                let batch_limit: i64 = row.get(1)?;
                Ok(GlobalSettings {
                    default_threshold: threshold as f32,
                    batch_label_limit: batch_limit.max(1) as usize,
                })
            })
            .unwrap_or_default();

        let mut stmt = conn.prepare(super::schema::SELECT_ALL_TYPES_SQL).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                let tag: String = row.get(0)?;
                let enabled: i64 = row.get(1)?;
                let threshold: f64 = row.get(2)?;
                let detector: String = row.get(3)?;
                let detector_label: String = row.get(4)?;
                let category: String = row.get(5)?;
                Ok((
                    TypeTag::new(tag),
                    PerTypeConfig {
                        enabled: enabled != 0,
                        threshold: threshold as f32,
                        detector: scope_from_str(&detector),
                        detector_label,
                        category,
                    },
                ))
            })
            .map_err(|e| ConfigError::Malformed(e.to_string()))?;

        let mut per_type: HashMap<TypeTag, PerTypeConfig> = HashMap::new();
        for row in rows {
            let (tag, cfg) = row.map_err(|e| ConfigError::Malformed(e.to_string()))?;
            if scopes.iter().any(|s| s.includes(cfg.detector)) {
                per_type.insert(tag, cfg);
            }
        }

        Ok(ConfigSnapshot { global, per_type })
    }
}
