//! `SQLite` schema for [`super::SqliteConfigStore`].
//!
//! Two tables: one row of global settings, one row per type tag's
//! per-type configuration. Deliberately thin — the store's internal
//! shape is opaque to the core; this is one reasonable concrete
//! layout, not the only one a real deployment must use.

pub const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS global_settings (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    default_threshold REAL NOT NULL,
    batch_label_limit INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS per_type_config (
    type_tag TEXT PRIMARY KEY,
    enabled INTEGER NOT NULL,
    threshold REAL NOT NULL,
    detector TEXT NOT NULL,
    detector_label TEXT NOT NULL,
    category TEXT NOT NULL
);
";

pub const UPSERT_GLOBAL_SQL: &str = "
INSERT INTO global_settings (id, default_threshold, batch_label_limit)
VALUES (1, ?1, ?2)
ON CONFLICT(id) DO UPDATE SET default_threshold = excluded.default_threshold, batch_label_limit = excluded.batch_label_limit;
";

pub const SELECT_GLOBAL_SQL: &str = "SELECT default_threshold, batch_label_limit FROM global_settings WHERE id = 1;";

pub const UPSERT_TYPE_SQL: &str = "
INSERT INTO per_type_config (type_tag, enabled, threshold, detector, detector_label, category)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
ON CONFLICT(type_tag) DO UPDATE SET
    enabled = excluded.enabled,
    threshold = excluded.threshold,
    detector = excluded.detector,
    detector_label = excluded.detector_label,
    category = excluded.category;
";

pub const SELECT_ALL_TYPES_SQL: &str = "SELECT type_tag, enabled, threshold, detector, detector_label, category FROM per_type_config;";
