/// SQL DDL for the ossuary database.
/// WAL mode + foreign keys enabled at connection time.
pub const SCHEMA_VERSION: u32 = 1;

pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS ledger (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    module TEXT NOT NULL,
    type TEXT NOT NULL,
    severity TEXT NOT NULL,
    payload TEXT NOT NULL,
    resonance_score INTEGER NOT NULL,
    source_reference TEXT NOT NULL,
    idempotency_key TEXT NOT NULL,
    processed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS analyses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    truth_index REAL NOT NULL,
    integrity_index REAL NOT NULL,
    risk_index REAL NOT NULL,
    awakening_index REAL NOT NULL,
    drift REAL NOT NULL,
    drift_direction TEXT NOT NULL,
    status TEXT NOT NULL,
    risk_level TEXT NOT NULL,
    patterns_detected TEXT NOT NULL,
    anomalies TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ledger_module ON ledger(module);
CREATE INDEX IF NOT EXISTS idx_ledger_severity ON ledger(severity);
CREATE INDEX IF NOT EXISTS idx_ledger_created ON ledger(created_at);
CREATE INDEX IF NOT EXISTS idx_ledger_idempotency ON ledger(idempotency_key);
CREATE INDEX IF NOT EXISTS idx_analyses_created ON analyses(created_at);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
"#;

pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;
PRAGMA synchronous = NORMAL;
"#;
