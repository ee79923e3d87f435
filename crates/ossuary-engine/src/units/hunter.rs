use serde_json::json;
use tracing::instrument;

use ossuary_core::{Module, Severity, UnitReport};
use ossuary_store::analyses::AnalysisRow;

use crate::context::UnitContext;
use crate::error::EngineError;
use crate::units::{run_steps, Unit};

/// Hunter sweeps the analysis window with three independent scans:
/// drift anomalies (HIGH), contradictions (MEDIUM), high-value signals
/// (CRITICAL). Each scan appends at most one summary record.
pub struct Hunter;

impl Hunter {
    fn scan_drift(
        ctx: &UnitContext,
        rows: &[AnalysisRow],
        report: &mut UnitReport,
    ) -> Result<(), EngineError> {
        let threshold = ctx.config.drift_threshold;
        let matched: Vec<i64> = rows
            .iter()
            .filter(|r| r.drift > threshold)
            .map(|r| r.id)
            .collect();

        if !matched.is_empty() {
            let record = ctx.derived_record(
                Module::Hunter,
                "DRIFT_ANOMALY",
                Severity::High,
                json!({
                    "count": matched.len(),
                    "threshold": threshold,
                    "analysisIds": matched,
                }),
                "analysis-window",
            );
            let _ = ctx.ledger.append(record)?;
            report.tally("DRIFT_ANOMALY");
        }
        Ok(())
    }

    fn scan_contradictions(
        ctx: &UnitContext,
        rows: &[AnalysisRow],
        report: &mut UnitReport,
    ) -> Result<(), EngineError> {
        let matched: Vec<i64> = rows
            .iter()
            .filter(|r| r.truth_index > 70.0 && r.risk_index > 60.0)
            .map(|r| r.id)
            .collect();

        if !matched.is_empty() {
            let record = ctx.derived_record(
                Module::Hunter,
                "CONTRADICTION",
                Severity::Medium,
                json!({
                    "count": matched.len(),
                    "analysisIds": matched,
                    "rule": "truthIndex>70 AND riskIndex>60",
                }),
                "analysis-window",
            );
            let _ = ctx.ledger.append(record)?;
            report.tally("CONTRADICTION");
        }
        Ok(())
    }

    fn scan_high_value(
        ctx: &UnitContext,
        rows: &[AnalysisRow],
        report: &mut UnitReport,
    ) -> Result<(), EngineError> {
        let matched: Vec<i64> = rows
            .iter()
            .filter(|r| r.awakening_index > 75.0 && r.truth_index > 75.0)
            .map(|r| r.id)
            .collect();

        if !matched.is_empty() {
            let record = ctx.derived_record(
                Module::Hunter,
                "HIGH_VALUE_SIGNAL",
                Severity::Critical,
                json!({
                    "count": matched.len(),
                    "analysisIds": matched,
                    "rule": "awakeningIndex>75 AND truthIndex>75",
                }),
                "analysis-window",
            );
            let _ = ctx.ledger.append(record)?;
            report.tally("HIGH_VALUE_SIGNAL");
        }
        Ok(())
    }
}

impl Unit for Hunter {
    fn module(&self) -> Module {
        Module::Hunter
    }

    #[instrument(skip_all)]
    fn run(&self, ctx: &UnitContext) -> UnitReport {
        let mut report = UnitReport::new(Module::Hunter);

        let rows = match ctx.analyses.recent(ctx.config.hunter_window as u32) {
            Ok(rows) => rows,
            Err(e) => {
                report.fail(format!("analysis window: {e}"));
                return report;
            }
        };

        run_steps(
            &mut report,
            vec![
                (
                    "drift scan",
                    Box::new(|report: &mut UnitReport| Self::scan_drift(ctx, &rows, report)),
                ),
                (
                    "contradiction scan",
                    Box::new(|report: &mut UnitReport| Self::scan_contradictions(ctx, &rows, report)),
                ),
                (
                    "high-value scan",
                    Box::new(|report: &mut UnitReport| Self::scan_high_value(ctx, &rows, report)),
                ),
            ],
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use ossuary_store::ledger::{LedgerFilter, SortOrder};

    use super::*;
    use crate::units::testutil::{self, AnalysisSeed};

    #[test]
    fn drift_scenario_exactly_one_high_record() {
        // Drifts {10, 45, 5} against threshold 30: one match.
        let ctx = testutil::context();
        for drift in [10.0, 45.0, 5.0] {
            let _ = testutil::seed_analysis(&ctx.db, AnalysisSeed { drift, ..Default::default() });
        }

        let report = Hunter.run(&ctx);
        assert!(report.success);
        assert_eq!(report.counts.get("DRIFT_ANOMALY"), Some(&1));

        let filter = LedgerFilter {
            module: Some(Module::Hunter),
            ..Default::default()
        };
        let rows = ctx.ledger.query(&filter, 10, SortOrder::Descending).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record_type, "DRIFT_ANOMALY");
        assert_eq!(rows[0].severity, Severity::High);
        assert_eq!(rows[0].payload["count"], 1);
    }

    #[test]
    fn quiet_window_writes_nothing() {
        let ctx = testutil::context();
        let _ = testutil::seed_analysis(&ctx.db, AnalysisSeed::default());

        let report = Hunter.run(&ctx);
        assert!(report.success);
        assert_eq!(report.total(), 0);
        assert_eq!(ctx.ledger.count().unwrap(), 0);
    }

    #[test]
    fn all_three_scans_fire_independently() {
        let ctx = testutil::context();
        // drift anomaly
        let _ = testutil::seed_analysis(&ctx.db, AnalysisSeed { drift: 60.0, ..Default::default() });
        // contradiction
        let _ = testutil::seed_analysis(
            &ctx.db,
            AnalysisSeed { truth: 80.0, risk: 65.0, ..Default::default() },
        );
        // high-value signal
        let _ = testutil::seed_analysis(
            &ctx.db,
            AnalysisSeed { awakening: 90.0, truth: 85.0, ..Default::default() },
        );

        let report = Hunter.run(&ctx);
        assert!(report.success);
        assert_eq!(report.counts["DRIFT_ANOMALY"], 1);
        assert_eq!(report.counts["CONTRADICTION"], 1);
        assert_eq!(report.counts["HIGH_VALUE_SIGNAL"], 1);

        let rows = ctx
            .ledger
            .query(&LedgerFilter::default(), 10, SortOrder::Descending)
            .unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn one_row_can_match_multiple_scans() {
        let ctx = testutil::context();
        let _ = testutil::seed_analysis(
            &ctx.db,
            AnalysisSeed {
                drift: 50.0,
                truth: 90.0,
                risk: 70.0,
                awakening: 80.0,
                ..Default::default()
            },
        );

        let report = Hunter.run(&ctx);
        assert_eq!(report.total(), 3);
    }

    #[test]
    fn threshold_is_exclusive() {
        let ctx = testutil::context();
        let _ = testutil::seed_analysis(&ctx.db, AnalysisSeed { drift: 30.0, ..Default::default() });

        let report = Hunter.run(&ctx);
        assert_eq!(report.counts.get("DRIFT_ANOMALY"), None);
    }
}
