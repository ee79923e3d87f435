use chrono::DateTime;
use serde_json::json;
use tracing::instrument;

use ossuary_core::{Module, Severity, UnitReport};
use ossuary_store::ledger::LedgerRecord;

use crate::context::UnitContext;
use crate::error::EngineError;
use crate::units::{run_steps, Unit};

/// Sin-Eater audits the ledger itself: re-parses stored payloads for
/// corruption (HIGH) and compares Miner's and Reaper's latest timestamps
/// for pipeline lag (MEDIUM). The review workflow ("mark reviewed") also
/// routes through this unit's contract, though the store does not enforce
/// that restriction by type.
pub struct SinEater;

impl SinEater {
    /// Full rescan each invocation, bounded by `scan_limit`; no high-water
    /// mark is kept.
    fn scan_corruption(ctx: &UnitContext, report: &mut UnitReport) -> Result<(), EngineError> {
        let rows = ctx.ledger.raw_payloads(ctx.config.scan_limit as u32)?;
        for (id, record_type, raw) in rows {
            if serde_json::from_str::<serde_json::Value>(&raw).is_err() {
                ctx.emit(
                    report,
                    "DATA_CORRUPTION",
                    Severity::High,
                    json!({
                        "recordId": id,
                        "recordType": record_type,
                        "reason": "payload failed to parse as JSON",
                    }),
                    &format!("ledger:{id}"),
                );
            }
        }
        Ok(())
    }

    /// Reaper trailing Miner means discovery output is piling up
    /// unsummarized.
    fn check_lag(ctx: &UnitContext, report: &mut UnitReport) -> Result<(), EngineError> {
        let miner = ctx.ledger.latest_created_at(Module::Miner)?;
        let reaper = ctx.ledger.latest_created_at(Module::Reaper)?;
        let (Some(miner), Some(reaper)) = (miner, reaper) else {
            return Ok(());
        };

        let miner_ts = DateTime::parse_from_rfc3339(&miner)
            .map_err(|e| EngineError::MalformedPayload(format!("miner timestamp: {e}")))?;
        let reaper_ts = DateTime::parse_from_rfc3339(&reaper)
            .map_err(|e| EngineError::MalformedPayload(format!("reaper timestamp: {e}")))?;

        let lag_ms = miner_ts.signed_duration_since(reaper_ts).num_milliseconds();
        if lag_ms > 0 {
            ctx.emit(
                report,
                "PIPELINE_DISSONANCE",
                Severity::Medium,
                json!({
                    "lagMs": lag_ms,
                    "minerLatest": miner,
                    "reaperLatest": reaper,
                }),
                "pipeline-timestamps",
            );
        }
        Ok(())
    }

    /// Generic error record with caller-supplied severity.
    pub fn log_error(
        ctx: &UnitContext,
        severity: Severity,
        message: &str,
    ) -> Result<LedgerRecord, EngineError> {
        let record = ctx.derived_record(
            Module::SinEater,
            "SYSTEM_ERROR",
            severity,
            json!({"message": message}),
            "caller",
        );
        Ok(ctx.ledger.append(record)?)
    }
}

impl Unit for SinEater {
    fn module(&self) -> Module {
        Module::SinEater
    }

    #[instrument(skip_all)]
    fn run(&self, ctx: &UnitContext) -> UnitReport {
        let mut report = UnitReport::new(Module::SinEater);

        run_steps(
            &mut report,
            vec![
                (
                    "corruption scan",
                    Box::new(|report: &mut UnitReport| Self::scan_corruption(ctx, report)),
                ),
                (
                    "lag check",
                    Box::new(|report: &mut UnitReport| Self::check_lag(ctx, report)),
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
    use crate::units::testutil;

    #[test]
    fn lag_scenario_emits_pipeline_dissonance() {
        // Reaper's latest is 5000ms behind Miner's.
        let ctx = testutil::context();
        let _ = testutil::seed_ledger_raw(
            &ctx.db,
            "MINER",
            "DISCOVERY_EVENT",
            "{}",
            "2026-08-28T12:00:05+00:00",
        );
        let _ = testutil::seed_ledger_raw(
            &ctx.db,
            "REAPER",
            "SEMANTIC_SUMMARY",
            "{}",
            "2026-08-28T12:00:00+00:00",
        );

        let report = SinEater.run(&ctx);
        assert!(report.success);
        assert_eq!(report.counts["PIPELINE_DISSONANCE"], 1);

        let filter = LedgerFilter {
            severity: Some(Severity::Medium),
            ..Default::default()
        };
        let rows = ctx.ledger.query(&filter, 10, SortOrder::Descending).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record_type, "PIPELINE_DISSONANCE");
        assert_eq!(rows[0].payload["lagMs"], 5000);
    }

    #[test]
    fn no_dissonance_when_reaper_is_current() {
        let ctx = testutil::context();
        let _ = testutil::seed_ledger_raw(
            &ctx.db,
            "MINER",
            "DISCOVERY_EVENT",
            "{}",
            "2026-08-28T12:00:00+00:00",
        );
        let _ = testutil::seed_ledger_raw(
            &ctx.db,
            "REAPER",
            "SEMANTIC_SUMMARY",
            "{}",
            "2026-08-28T12:00:03+00:00",
        );

        let report = SinEater.run(&ctx);
        assert!(report.success);
        assert_eq!(report.counts.get("PIPELINE_DISSONANCE"), None);
    }

    #[test]
    fn lag_check_skipped_until_both_modules_have_written() {
        let ctx = testutil::context();
        let _ = testutil::seed_ledger_raw(
            &ctx.db,
            "MINER",
            "DISCOVERY_EVENT",
            "{}",
            "2026-08-28T12:00:00+00:00",
        );

        let report = SinEater.run(&ctx);
        assert!(report.success);
        assert_eq!(report.total(), 0);
    }

    #[test]
    fn corruption_scan_flags_malformed_payloads() {
        let ctx = testutil::context();
        let good = testutil::seed_ledger_raw(
            &ctx.db,
            "MINER",
            "DISCOVERY_EVENT",
            r#"{"files": 2}"#,
            "2026-08-28T12:00:00+00:00",
        );
        let bad = testutil::seed_ledger_raw(
            &ctx.db,
            "MINER",
            "DISCOVERY_EVENT",
            "{truncated",
            "2026-08-28T12:00:01+00:00",
        );

        let report = SinEater.run(&ctx);
        assert!(report.success);
        assert_eq!(report.counts["DATA_CORRUPTION"], 1);

        let filter = LedgerFilter {
            module: Some(Module::SinEater),
            ..Default::default()
        };
        let rows = ctx.ledger.query(&filter, 10, SortOrder::Descending).unwrap();
        assert_eq!(rows[0].severity, Severity::High);
        assert_eq!(rows[0].payload["recordId"], bad);
        assert_ne!(rows[0].payload["recordId"], good);
    }

    #[test]
    fn scan_is_a_full_rescan_each_run() {
        let ctx = testutil::context();
        let _ = testutil::seed_ledger_raw(
            &ctx.db,
            "MINER",
            "DISCOVERY_EVENT",
            "{truncated",
            "2026-08-28T12:00:00+00:00",
        );

        let first = SinEater.run(&ctx);
        let second = SinEater.run(&ctx);
        assert_eq!(first.counts["DATA_CORRUPTION"], 1);
        // No high-water mark: the same corrupt row is flagged again.
        assert_eq!(second.counts["DATA_CORRUPTION"], 1);
    }

    #[test]
    fn log_error_uses_caller_severity() {
        let ctx = testutil::context();
        let record =
            SinEater::log_error(&ctx, Severity::Critical, "ingest worker crashed").unwrap();
        assert_eq!(record.module, Module::SinEater);
        assert_eq!(record.record_type, "SYSTEM_ERROR");
        assert_eq!(record.severity, Severity::Critical);
        assert_eq!(record.payload["message"], "ingest worker crashed");
    }
}
