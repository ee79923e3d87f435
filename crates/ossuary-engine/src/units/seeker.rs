use std::collections::BTreeMap;

use serde_json::json;
use tracing::instrument;

use ossuary_core::{Module, Severity, UnitReport};
use ossuary_store::analyses::AnalysisRow;

use crate::context::UnitContext;
use crate::units::Unit;

/// Seeker scores every unordered pair in its window and records the pairs
/// that resonate, plus cluster distributions by status and risk level.
/// All output is INFO. The pairwise scan is O(n²) but bounded by the
/// fixed window size, so cost per cycle is constant.
pub struct Seeker;

/// Weighted field agreement, normalized by the total weight evaluated.
/// Symmetric by construction.
pub fn similarity(a: &AnalysisRow, b: &AnalysisRow) -> f64 {
    let mut score = 0.0;
    let mut total = 0.0;

    total += 0.3;
    if a.status == b.status {
        score += 0.3;
    }

    total += 0.3;
    if a.risk_level == b.risk_level {
        score += 0.3;
    }

    total += 0.2;
    if (a.truth_index - b.truth_index).abs() <= 20.0 {
        score += 0.2;
    }

    total += 0.2;
    if (a.integrity_index - b.integrity_index).abs() <= 20.0 {
        score += 0.2;
    }

    if total == 0.0 {
        0.0
    } else {
        score / total
    }
}

fn tally_by<F: Fn(&AnalysisRow) -> &str>(rows: &[AnalysisRow], key: F) -> BTreeMap<String, i64> {
    let mut clusters = BTreeMap::new();
    for row in rows {
        *clusters.entry(key(row).to_string()).or_insert(0) += 1;
    }
    clusters
}

impl Unit for Seeker {
    fn module(&self) -> Module {
        Module::Seeker
    }

    #[instrument(skip_all)]
    fn run(&self, ctx: &UnitContext) -> UnitReport {
        let mut report = UnitReport::new(Module::Seeker);

        let rows = match ctx.analyses.recent(ctx.config.seeker_window as u32) {
            Ok(rows) => rows,
            Err(e) => {
                report.fail(format!("analysis window: {e}"));
                return report;
            }
        };

        for i in 0..rows.len() {
            for j in (i + 1)..rows.len() {
                let score = similarity(&rows[i], &rows[j]);
                if score >= ctx.config.similarity_threshold {
                    ctx.emit(
                        &mut report,
                        "RESONANCE_RELATIONSHIP",
                        Severity::Info,
                        json!({
                            "analysisA": rows[i].id,
                            "analysisB": rows[j].id,
                            "similarity": score,
                        }),
                        &format!("analysis:{}+{}", rows[i].id, rows[j].id),
                    );
                }
            }
        }

        if !rows.is_empty() {
            ctx.emit(
                &mut report,
                "CLUSTER_DISTRIBUTION",
                Severity::Info,
                json!({
                    "groupBy": "status",
                    "clusters": tally_by(&rows, |r| &r.status),
                }),
                "analysis-window",
            );
            ctx.emit(
                &mut report,
                "CLUSTER_DISTRIBUTION",
                Severity::Info,
                json!({
                    "groupBy": "riskLevel",
                    "clusters": tally_by(&rows, |r| &r.risk_level),
                }),
                "analysis-window",
            );
        }

        report
    }
}
