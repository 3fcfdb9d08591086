//! SQLite schema definition.

/// Complete database schema for gramin-health.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients (owned by registration; read here by phone number)
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    local_id TEXT PRIMARY KEY,
    phone_number TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    caregiver_phone TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Readings (Append-Only)
-- ============================================================================

CREATE TABLE IF NOT EXISTS readings (
    reading_id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(local_id),
    kind TEXT NOT NULL CHECK (kind IN ('BP', 'SUGAR')),
    value1 INTEGER NOT NULL,
    value2 INTEGER,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    -- BP carries both values, SUGAR never carries value2
    CHECK ((kind = 'BP' AND value2 IS NOT NULL) OR (kind = 'SUGAR' AND value2 IS NULL))
);

CREATE INDEX IF NOT EXISTS idx_readings_patient ON readings(patient_id, created_at);

-- ============================================================================
-- Triage Reports (Append-Only)
-- ============================================================================

CREATE TABLE IF NOT EXISTS triage_reports (
    report_id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(local_id),
    chief_complaint TEXT NOT NULL,
    notes TEXT NOT NULL DEFAULT '',
    tier TEXT NOT NULL,
    prediction TEXT NOT NULL,                    -- JSON TriagePrediction
    prediction_text TEXT NOT NULL CHECK (length(prediction_text) > 0),
    model_version TEXT,                          -- NULL when artifacts were missing
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_reports_patient ON triage_reports(patient_id, created_at);
"#;
