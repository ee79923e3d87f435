use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use ossuary_core::{Module, Severity};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

/// A stored ledger row. Immutable once written except for `processed`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub id: i64,
    pub module: Module,
    pub record_type: String,
    pub severity: Severity,
    pub payload: serde_json::Value,
    /// Fixed-point resonance tag, scaled by 100 (167 displays as 1.67).
    /// Purely informational.
    pub resonance_score: i64,
    pub source_reference: String,
    /// Advisory: indexed for lookups, never UNIQUE-constrained.
    pub idempotency_key: String,
    pub processed: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for a single append. The store assigns `id`, `processed`,
/// and the timestamps.
#[derive(Clone, Debug)]
pub struct NewLedgerRecord {
    pub module: Module,
    pub record_type: String,
    pub severity: Severity,
    pub payload: serde_json::Value,
    pub resonance_score: i64,
    pub source_reference: String,
    pub idempotency_key: String,
}

/// Read-side filter. All fields optional; absent means unfiltered.
#[derive(Clone, Debug, Default)]
pub struct LedgerFilter {
    pub module: Option<Module>,
    pub severity: Option<Severity>,
    /// RFC3339 lower bound on `created_at` (exclusive).
    pub created_after: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SortOrder {
    /// Newest first — the dashboard default.
    #[default]
    Descending,
    /// Chronological replay, for timelines.
    Ascending,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GroupBy {
    Module,
    Severity,
}

const SELECT_COLUMNS: &str = "id, module, type, severity, payload, resonance_score, \
     source_reference, idempotency_key, processed, created_at, updated_at";

pub struct LedgerRepo {
    db: Database,
}

impl LedgerRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert one record. Does not enforce idempotency-key uniqueness;
    /// deduplication across retries is advisory.
    #[instrument(skip(self, record), fields(module = %record.module, record_type = %record.record_type))]
    pub fn append(&self, record: NewLedgerRecord) -> Result<LedgerRecord, StoreError> {
        self.db.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            let _ = conn.execute(
                "INSERT INTO ledger (module, type, severity, payload, resonance_score, \
                 source_reference, idempotency_key, processed, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?8)",
                rusqlite::params![
                    record.module.as_str(),
                    record.record_type,
                    record.severity.as_str(),
                    serde_json::to_string(&record.payload)?,
                    record.resonance_score,
                    record.source_reference,
                    record.idempotency_key,
                    now,
                ],
            )?;
            let id = conn.last_insert_rowid();

            Ok(LedgerRecord {
                id,
                module: record.module,
                record_type: record.record_type,
                severity: record.severity,
                payload: record.payload,
                resonance_score: record.resonance_score,
                source_reference: record.source_reference,
                idempotency_key: record.idempotency_key,
                processed: false,
                created_at: now.clone(),
                updated_at: now,
            })
        })
    }

    /// Filtered listing ordered by `created_at` (id as tie-break).
    #[instrument(skip(self, filter))]
    pub fn query(
        &self,
        filter: &LedgerFilter,
        limit: u32,
        order: SortOrder,
    ) -> Result<Vec<LedgerRecord>, StoreError> {
        self.db.with_conn(|conn| {
            let mut sql = format!("SELECT {SELECT_COLUMNS} FROM ledger");
            let mut clauses: Vec<String> = Vec::new();
            let mut params: Vec<String> = Vec::new();

            if let Some(module) = filter.module {
                params.push(module.as_str().to_string());
                clauses.push(format!("module = ?{}", params.len()));
            }
            if let Some(severity) = filter.severity {
                params.push(severity.as_str().to_string());
                clauses.push(format!("severity = ?{}", params.len()));
            }
            if let Some(ref created_after) = filter.created_after {
                params.push(created_after.clone());
                clauses.push(format!("created_at > ?{}", params.len()));
            }

            if !clauses.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clauses.join(" AND "));
            }

            let direction = match order {
                SortOrder::Descending => "DESC",
                SortOrder::Ascending => "ASC",
            };
            sql.push_str(&format!(
                " ORDER BY created_at {direction}, id {direction} LIMIT {limit}"
            ));

            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_record(row)?);
            }
            Ok(results)
        })
    }

    /// Set `processed = true`. Idempotent: a second call on the same id is a
    /// no-op success, and `updated_at` bumps only on the actual flip.
    #[instrument(skip(self))]
    pub fn mark_processed(&self, id: i64) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            let changed = conn.execute(
                "UPDATE ledger SET processed = 1, updated_at = ?1 WHERE id = ?2 AND processed = 0",
                rusqlite::params![now, id],
            )?;
            if changed == 0 {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM ledger WHERE id = ?1)",
                    [id],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(StoreError::NotFound(format!("ledger record {id}")));
                }
            }
            Ok(())
        })
    }

    /// Counts grouped by module or severity, for the status projection.
    #[instrument(skip(self))]
    pub fn aggregate_counts(&self, group_by: GroupBy) -> Result<BTreeMap<String, i64>, StoreError> {
        self.db.with_conn(|conn| {
            let column = match group_by {
                GroupBy::Module => "module",
                GroupBy::Severity => "severity",
            };
            let mut stmt = conn
                .prepare(&format!("SELECT {column}, COUNT(*) FROM ledger GROUP BY {column}"))?;
            let mut rows = stmt.query([])?;
            let mut counts = BTreeMap::new();
            while let Some(row) = rows.next()? {
                let key: String = row_helpers::get(row, 0, "ledger", "group key")?;
                let count: i64 = row_helpers::get(row, 1, "ledger", "count")?;
                let _ = counts.insert(key, count);
            }
            Ok(counts)
        })
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        self.db.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM ledger", [], |row| row.get(0))?)
        })
    }

    /// Latest `created_at` for one producer module, if it has ever written.
    #[instrument(skip(self))]
    pub fn latest_created_at(&self, module: Module) -> Result<Option<String>, StoreError> {
        self.db.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT MAX(created_at) FROM ledger WHERE module = ?1",
                [module.as_str()],
                |row| row.get(0),
            )?)
        })
    }

    /// `(id, record type, raw payload text)` without JSON parsing, oldest
    /// first. The corruption scan uses this so malformed payloads surface as
    /// scan findings instead of query failures.
    #[instrument(skip(self))]
    pub fn raw_payloads(&self, limit: u32) -> Result<Vec<(i64, String, String)>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT id, type, payload FROM ledger ORDER BY id ASC LIMIT {limit}"
            ))?;
            let mut rows = stmt.query([])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push((
                    row_helpers::get(row, 0, "ledger", "id")?,
                    row_helpers::get(row, 1, "ledger", "type")?,
                    row_helpers::get(row, 2, "ledger", "payload")?,
                ));
            }
            Ok(results)
        })
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<LedgerRecord, StoreError> {
    let module_str: String = row_helpers::get(row, 1, "ledger", "module")?;
    let severity_str: String = row_helpers::get(row, 3, "ledger", "severity")?;
    let payload_str: String = row_helpers::get(row, 4, "ledger", "payload")?;

    Ok(LedgerRecord {
        id: row_helpers::get(row, 0, "ledger", "id")?,
        module: row_helpers::parse_enum(&module_str, "ledger", "module")?,
        record_type: row_helpers::get(row, 2, "ledger", "type")?,
        severity: row_helpers::parse_enum(&severity_str, "ledger", "severity")?,
        payload: row_helpers::parse_json(&payload_str, "ledger", "payload")?,
        resonance_score: row_helpers::get(row, 5, "ledger", "resonance_score")?,
        source_reference: row_helpers::get(row, 6, "ledger", "source_reference")?,
        idempotency_key: row_helpers::get(row, 7, "ledger", "idempotency_key")?,
        processed: row_helpers::get(row, 8, "ledger", "processed")?,
        created_at: row_helpers::get(row, 9, "ledger", "created_at")?,
        updated_at: row_helpers::get(row, 10, "ledger", "updated_at")?,
    })
}
