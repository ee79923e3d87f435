use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

/// A pre-scored analysis row. Owned by an external collaborator; this repo
/// is strictly read-only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisRow {
    pub id: i64,
    pub truth_index: f64,
    pub integrity_index: f64,
    pub risk_index: f64,
    pub awakening_index: f64,
    pub drift: f64,
    pub drift_direction: String,
    pub status: String,
    pub risk_level: String,
    /// JSON-encoded string as stored upstream; parsed lazily by consumers.
    pub patterns_detected: String,
    pub anomalies: String,
    pub created_at: String,
}

const SELECT_COLUMNS: &str = "id, truth_index, integrity_index, risk_index, awakening_index, \
     drift, drift_direction, status, risk_level, patterns_detected, anomalies, created_at";

pub struct AnalysisRepo {
    db: Database,
}

impl AnalysisRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Most-recent-first batch window.
    #[instrument(skip(self))]
    pub fn recent(&self, limit: u32) -> Result<Vec<AnalysisRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM analyses ORDER BY created_at DESC, id DESC LIMIT {limit}"
            ))?;
            let mut rows = stmt.query([])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_analysis(row)?);
            }
            Ok(results)
        })
    }

    #[instrument(skip(self))]
    pub fn get(&self, id: i64) -> Result<AnalysisRow, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {SELECT_COLUMNS} FROM analyses WHERE id = ?1"))?;
            let mut rows = stmt.query([id])?;
            match rows.next()? {
                Some(row) => row_to_analysis(row),
                None => Err(StoreError::NotFound(format!("analysis {id}"))),
            }
        })
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        self.db.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM analyses", [], |row| row.get(0))?)
        })
    }
}

fn row_to_analysis(row: &rusqlite::Row<'_>) -> Result<AnalysisRow, StoreError> {
    Ok(AnalysisRow {
        id: row_helpers::get(row, 0, "analyses", "id")?,
        truth_index: row_helpers::get(row, 1, "analyses", "truth_index")?,
        integrity_index: row_helpers::get(row, 2, "analyses", "integrity_index")?,
        risk_index: row_helpers::get(row, 3, "analyses", "risk_index")?,
        awakening_index: row_helpers::get(row, 4, "analyses", "awakening_index")?,
        drift: row_helpers::get(row, 5, "analyses", "drift")?,
        drift_direction: row_helpers::get(row, 6, "analyses", "drift_direction")?,
        status: row_helpers::get(row, 7, "analyses", "status")?,
        risk_level: row_helpers::get(row, 8, "analyses", "risk_level")?,
        patterns_detected: row_helpers::get(row, 9, "analyses", "patterns_detected")?,
        anomalies: row_helpers::get(row, 10, "analyses", "anomalies")?,
        created_at: row_helpers::get(row, 11, "analyses", "created_at")?,
    })
}
