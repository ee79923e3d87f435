use serde_json::json;
use tracing::instrument;

use ossuary_core::{Module, Severity, UnitReport};
use ossuary_store::analyses::AnalysisRow;

use crate::context::UnitContext;
use crate::error::EngineError;
use crate::units::Unit;

/// Reaper distills each analysis row in its batch window into one
/// `SEMANTIC_SUMMARY` record tagging the risk-derived fields.
pub struct Reaper;

impl Reaper {
    /// HIGH above 70, MEDIUM above 40, LOW otherwise.
    fn severity_for(risk_index: f64) -> Severity {
        if risk_index > 70.0 {
            Severity::High
        } else if risk_index > 40.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    fn summarize(row: &AnalysisRow) -> Result<serde_json::Value, EngineError> {
        let patterns: serde_json::Value = serde_json::from_str(&row.patterns_detected)
            .map_err(|e| EngineError::MalformedPayload(format!("patterns_detected: {e}")))?;

        Ok(json!({
            "analysisId": row.id,
            "truthIndex": row.truth_index,
            "riskIndex": row.risk_index,
            "drift": row.drift,
            "driftDirection": row.drift_direction,
            "status": row.status,
            "riskLevel": row.risk_level,
            "patterns": patterns,
        }))
    }
}

impl Unit for Reaper {
    fn module(&self) -> Module {
        Module::Reaper
    }

    #[instrument(skip_all)]
    fn run(&self, ctx: &UnitContext) -> UnitReport {
        let mut report = UnitReport::new(Module::Reaper);

        let rows = match ctx.analyses.recent(ctx.config.reaper_batch as u32) {
            Ok(rows) => rows,
            Err(e) => {
                report.fail(format!("analysis batch: {e}"));
                return report;
            }
        };

        // One bad row never blocks its siblings.
        for row in rows {
            match Self::summarize(&row) {
                Ok(payload) => ctx.emit(
                    &mut report,
                    "SEMANTIC_SUMMARY",
                    Self::severity_for(row.risk_index),
                    payload,
                    &format!("analysis:{}", row.id),
                ),
                Err(e) => report.fail(format!("analysis {}: {e}", row.id)),
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use ossuary_store::ledger::{LedgerFilter, SortOrder};

    use super::*;
    use crate::units::testutil::{self, AnalysisSeed};

    #[test]
    fn empty_batch_succeeds_with_zero_writes() {
        let ctx = testutil::context();
        let report = Reaper.run(&ctx);
        assert!(report.success);
        assert_eq!(report.total(), 0);
        assert_eq!(ctx.ledger.count().unwrap(), 0);
    }

    #[test]
    fn one_summary_per_analysis_with_risk_severity() {
        let ctx = testutil::context();
        let _ = testutil::seed_analysis(&ctx.db, AnalysisSeed { risk: 85.0, ..Default::default() });
        let _ = testutil::seed_analysis(&ctx.db, AnalysisSeed { risk: 55.0, ..Default::default() });
        let _ = testutil::seed_analysis(&ctx.db, AnalysisSeed { risk: 10.0, ..Default::default() });

        let report = Reaper.run(&ctx);
        assert!(report.success);
        assert_eq!(report.counts["SEMANTIC_SUMMARY"], 3);

        let rows = ctx
            .ledger
            .query(&LedgerFilter::default(), 10, SortOrder::Descending)
            .unwrap();
        let mut severities: Vec<Severity> = rows.iter().map(|r| r.severity).collect();
        severities.sort();
        assert_eq!(severities, vec![Severity::High, Severity::Medium, Severity::Low]);
    }

    #[test]
    fn malformed_patterns_blob_fails_row_not_batch() {
        let ctx = testutil::context();
        let bad = testutil::seed_analysis(&ctx.db, AnalysisSeed { patterns: "{broken", ..Default::default() });
        let _ = testutil::seed_analysis(&ctx.db, AnalysisSeed::default());

        let report = Reaper.run(&ctx);
        assert!(!report.success);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains(&format!("analysis {bad}")));
        // The sibling row still produced its summary.
        assert_eq!(report.counts["SEMANTIC_SUMMARY"], 1);
    }

    #[test]
    fn batch_respects_reaper_batch_cap() {
        let mut config = crate::config::EngineConfig::default();
        config.reaper_batch = 2;
        let ctx = testutil::context_with(config);
        for _ in 0..4 {
            let _ = testutil::seed_analysis(&ctx.db, AnalysisSeed::default());
        }

        let report = Reaper.run(&ctx);
        assert_eq!(report.counts["SEMANTIC_SUMMARY"], 2);
    }

    #[test]
    fn severity_rule_boundaries() {
        assert_eq!(Reaper::severity_for(70.0), Severity::Medium);
        assert_eq!(Reaper::severity_for(70.1), Severity::High);
        assert_eq!(Reaper::severity_for(40.0), Severity::Low);
        assert_eq!(Reaper::severity_for(40.1), Severity::Medium);
    }
}
