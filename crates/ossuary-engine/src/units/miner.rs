use serde_json::json;
use tracing::instrument;

use ossuary_core::{Module, Severity, UnitReport};

use crate::context::UnitContext;
use crate::units::Unit;

/// Miner turns upstream discovery signals (commit/file deltas) into
/// `DISCOVERY_EVENT` records, always severity INFO.
pub struct Miner;

impl Unit for Miner {
    fn module(&self) -> Module {
        Module::Miner
    }

    #[instrument(skip_all)]
    fn run(&self, ctx: &UnitContext) -> UnitReport {
        let mut report = UnitReport::new(Module::Miner);

        let signals = match ctx.discovery.poll(ctx.config.discovery_batch) {
            Ok(signals) => signals,
            Err(e) => {
                report.fail(format!("discovery poll: {e}"));
                return report;
            }
        };

        for signal in signals {
            ctx.emit(
                &mut report,
                "DISCOVERY_EVENT",
                Severity::Info,
                json!({
                    "origin": signal.origin,
                    "summary": signal.summary,
                    "detail": signal.detail,
                }),
                &signal.origin,
            );
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ossuary_store::ledger::{LedgerFilter, SortOrder};
    use ossuary_store::Database;
    use serde_json::json;

    use super::*;
    use crate::config::EngineConfig;
    use crate::context::{DiscoverySignal, DiscoverySource, StaticDiscovery};
    use crate::error::EngineError;
    use crate::units::testutil;

    fn ctx_with_signals(signals: Vec<DiscoverySignal>) -> UnitContext {
        UnitContext::new(
            Database::in_memory().unwrap(),
            EngineConfig::default(),
            Arc::new(StaticDiscovery::new(signals)),
        )
        .unwrap()
    }

    #[test]
    fn one_record_per_signal_all_info() {
        let ctx = ctx_with_signals(vec![
            DiscoverySignal {
                origin: "repo/alpha".to_string(),
                summary: "3 new files".to_string(),
                detail: json!({"files": 3}),
            },
            DiscoverySignal {
                origin: "repo/beta".to_string(),
                summary: "commit d34db33f".to_string(),
                detail: json!({"commits": 1}),
            },
        ]);

        let report = Miner.run(&ctx);
        assert!(report.success);
        assert_eq!(report.counts["DISCOVERY_EVENT"], 2);

        let filter = LedgerFilter {
            module: Some(Module::Miner),
            ..Default::default()
        };
        let rows = ctx.ledger.query(&filter, 10, SortOrder::Ascending).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.severity == Severity::Info));
        assert_eq!(rows[0].source_reference, "repo/alpha");
        assert_eq!(rows[1].payload["summary"], "commit d34db33f");
    }

    #[test]
    fn empty_feed_is_a_clean_success() {
        let ctx = testutil::context();
        let report = Miner.run(&ctx);
        assert!(report.success);
        assert_eq!(report.total(), 0);
        assert_eq!(ctx.ledger.count().unwrap(), 0);
    }

    #[test]
    fn poll_respects_discovery_batch() {
        let signals = (0..10)
            .map(|i| DiscoverySignal {
                origin: format!("repo/{i}"),
                summary: "delta".to_string(),
                detail: json!({}),
            })
            .collect();
        let mut ctx = ctx_with_signals(signals);
        ctx.config.discovery_batch = 4;

        let report = Miner.run(&ctx);
        assert_eq!(report.counts["DISCOVERY_EVENT"], 4);
    }

    #[test]
    fn poll_failure_reported_not_raised() {
        struct BrokenFeed;
        impl DiscoverySource for BrokenFeed {
            fn poll(&self, _limit: usize) -> Result<Vec<DiscoverySignal>, EngineError> {
                Err(EngineError::MalformedPayload("upstream gone".to_string()))
            }
        }

        let ctx = UnitContext::new(
            Database::in_memory().unwrap(),
            EngineConfig::default(),
            Arc::new(BrokenFeed),
        )
        .unwrap();

        let report = Miner.run(&ctx);
        assert!(!report.success);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.total(), 0);
    }
}
