use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use ossuary_core::{Module, Severity, UnitReport};
use ossuary_store::analyses::AnalysisRepo;
use ossuary_store::ledger::{LedgerRepo, NewLedgerRecord};
use ossuary_store::Database;

use crate::config::EngineConfig;
use crate::error::EngineError;

/// One upstream discovery signal (commit/file delta or similar).
#[derive(Clone, Debug)]
pub struct DiscoverySignal {
    pub origin: String,
    pub summary: String,
    pub detail: serde_json::Value,
}

/// Seam for Miner's upstream feed. Real repository integration lives
/// outside the core; production wiring uses the static source.
pub trait DiscoverySource: Send + Sync {
    fn poll(&self, limit: usize) -> Result<Vec<DiscoverySignal>, EngineError>;
}

/// Fixed in-memory feed: returns up to `limit` of the configured signals.
#[derive(Default)]
pub struct StaticDiscovery {
    signals: Vec<DiscoverySignal>,
}

impl StaticDiscovery {
    pub fn new(signals: Vec<DiscoverySignal>) -> Self {
        Self { signals }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl DiscoverySource for StaticDiscovery {
    fn poll(&self, limit: usize) -> Result<Vec<DiscoverySignal>, EngineError> {
        Ok(self.signals.iter().take(limit).cloned().collect())
    }
}

/// Everything a unit needs for one invocation: the two repos, the config,
/// and the discovery seam. Cheap to clone alongside `Database`.
pub struct UnitContext {
    pub db: Database,
    pub ledger: LedgerRepo,
    pub analyses: AnalysisRepo,
    pub config: EngineConfig,
    pub discovery: Arc<dyn DiscoverySource>,
}

impl UnitContext {
    /// Validates the config before any store access.
    pub fn new(
        db: Database,
        config: EngineConfig,
        discovery: Arc<dyn DiscoverySource>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            ledger: LedgerRepo::new(db.clone()),
            analyses: AnalysisRepo::new(db.clone()),
            db,
            config,
            discovery,
        })
    }

    /// Append one derived record with a fresh idempotency key and the
    /// configured resonance tag. Append failure lands in the report's
    /// error list; it never aborts the calling unit.
    pub fn emit(
        &self,
        report: &mut UnitReport,
        record_type: &str,
        severity: Severity,
        payload: serde_json::Value,
        source_reference: &str,
    ) {
        let record = self.derived_record(report.module, record_type, severity, payload, source_reference);
        match self.ledger.append(record) {
            Ok(_) => report.tally(record_type),
            Err(e) => {
                warn!(module = %report.module, record_type, error = %e, "ledger append failed");
                report.fail(format!("append {record_type}: {e}"));
            }
        }
    }

    /// Build a derived record without appending it (for callers that
    /// propagate store errors themselves).
    pub fn derived_record(
        &self,
        module: Module,
        record_type: &str,
        severity: Severity,
        payload: serde_json::Value,
        source_reference: &str,
    ) -> NewLedgerRecord {
        NewLedgerRecord {
            module,
            record_type: record_type.to_string(),
            severity,
            payload,
            resonance_score: self.config.lambda_resonance,
            source_reference: source_reference.to_string(),
            idempotency_key: format!(
                "{module}-{record_type}-{}",
                Utc::now().timestamp_millis()
            ),
        }
    }
}
