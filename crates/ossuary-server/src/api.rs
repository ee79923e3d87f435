//! Wire projection of ledger records for the dashboard client.

use serde::Serialize;

use ossuary_core::{Module, Severity};
use ossuary_store::ledger::LedgerRecord;

/// JSON shape the dashboard consumes. `resonanceScore` is the stored
/// fixed-point value divided by 100 (167 -> 1.67).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRecord {
    pub id: i64,
    pub module: Module,
    #[serde(rename = "type")]
    pub record_type: String,
    pub severity: Severity,
    pub payload: serde_json::Value,
    pub resonance_score: f64,
    pub source_reference: String,
    pub idempotency_key: String,
    pub processed: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<LedgerRecord> for ApiRecord {
    fn from(record: LedgerRecord) -> Self {
        Self {
            id: record.id,
            module: record.module,
            record_type: record.record_type,
            severity: record.severity,
            payload: record.payload,
            resonance_score: record.resonance_score as f64 / 100.0,
            source_reference: record.source_reference,
            idempotency_key: record.idempotency_key,
            processed: record.processed,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
