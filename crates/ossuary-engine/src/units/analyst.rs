use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use serde_json::json;
use tracing::instrument;

use ossuary_core::{Module, Severity, UnitReport};
use ossuary_store::ledger::{LedgerFilter, LedgerRecord, SortOrder};

use crate::context::UnitContext;
use crate::error::EngineError;
use crate::units::{run_steps, Unit};

/// Read cap for the briefing/timeline windows. Ledger growth is bounded by
/// per-cycle batch caps, so this is generous.
const QUERY_CAP: u32 = 1000;

const BRIEFING_CRITICAL_CAP: usize = 10;

const RECOMMENDATIONS: [&str; 4] = [
    "Review critical alerts before the next cycle.",
    "Confirm Reaper is keeping pace with Miner discoveries.",
    "Triage unprocessed Sin-Eater findings.",
    "Re-run Seeker after the next analysis import.",
];

/// Analyst condenses the recent ledger into one strategic briefing and one
/// calendar-day timeline, both INFO.
pub struct Analyst;

impl Analyst {
    fn module_counts(rows: &[LedgerRecord]) -> BTreeMap<String, i64> {
        let mut counts = BTreeMap::new();
        for row in rows {
            *counts.entry(row.module.as_str().to_string()).or_insert(0) += 1;
        }
        counts
    }

    fn findings(rows: &[LedgerRecord], counts: &BTreeMap<String, i64>) -> Vec<String> {
        if rows.is_empty() {
            return vec!["No intelligence activity in the reporting window.".to_string()];
        }

        let mut findings = vec![format!(
            "{} records from {} modules in the reporting window.",
            rows.len(),
            counts.len()
        )];
        if let Some(hunter) = counts.get(Module::Hunter.as_str()) {
            findings.push(format!("Hunter raised {hunter} pattern alerts."));
        }
        if let Some(sin_eater) = counts.get(Module::SinEater.as_str()) {
            findings.push(format!("Sin-Eater recorded {sin_eater} integrity findings."));
        }
        let critical = rows.iter().filter(|r| r.severity == Severity::Critical).count();
        if critical > 0 {
            findings.push(format!("{critical} critical alerts require review."));
        }
        findings
    }

    fn briefing(ctx: &UnitContext, report: &mut UnitReport) -> Result<(), EngineError> {
        let window_days = ctx.config.briefing_window_days;
        let since = (Utc::now() - Duration::days(window_days)).to_rfc3339();
        let rows = ctx.ledger.query(
            &LedgerFilter {
                created_after: Some(since),
                ..Default::default()
            },
            QUERY_CAP,
            SortOrder::Descending,
        )?;

        let counts = Self::module_counts(&rows);
        let critical_alerts: Vec<serde_json::Value> = rows
            .iter()
            .filter(|r| r.severity == Severity::Critical)
            .take(BRIEFING_CRITICAL_CAP)
            .map(|r| {
                json!({
                    "id": r.id,
                    "module": r.module,
                    "type": r.record_type,
                    "createdAt": r.created_at,
                })
            })
            .collect();

        ctx.emit(
            report,
            "STRATEGIC_BRIEFING",
            Severity::Info,
            json!({
                "windowDays": window_days,
                "totalRecords": rows.len(),
                "moduleCounts": counts,
                "findings": Self::findings(&rows, &counts),
                "criticalAlerts": critical_alerts,
                "recommendations": RECOMMENDATIONS,
            }),
            "ledger-window",
        );
        Ok(())
    }

    fn timeline(ctx: &UnitContext, report: &mut UnitReport) -> Result<(), EngineError> {
        let window_days = ctx.config.timeline_window_days;
        let since = (Utc::now() - Duration::days(window_days)).to_rfc3339();
        // Ascending: timelines replay chronologically.
        let rows = ctx.ledger.query(
            &LedgerFilter {
                created_after: Some(since),
                ..Default::default()
            },
            QUERY_CAP,
            SortOrder::Ascending,
        )?;

        let mut days: BTreeMap<String, i64> = BTreeMap::new();
        for row in &rows {
            let day = row.created_at.get(..10).unwrap_or(&row.created_at);
            *days.entry(day.to_string()).or_insert(0) += 1;
        }

        ctx.emit(
            report,
            "INTELLIGENCE_TIMELINE",
            Severity::Info,
            json!({
                "windowDays": window_days,
                "totalEvents": rows.len(),
                "days": days,
            }),
            "ledger-window",
        );
        Ok(())
    }
}

impl Unit for Analyst {
    fn module(&self) -> Module {
        Module::Analyst
    }

    #[instrument(skip_all)]
    fn run(&self, ctx: &UnitContext) -> UnitReport {
        let mut report = UnitReport::new(Module::Analyst);

        run_steps(
            &mut report,
            vec![
                (
                    "strategic briefing",
                    Box::new(|report: &mut UnitReport| Self::briefing(ctx, report)),
                ),
                (
                    "timeline",
                    Box::new(|report: &mut UnitReport| Self::timeline(ctx, report)),
                ),
            ],
        );

        report
    }
}
