use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::module::Module;

/// Outcome of one unit invocation.
///
/// A unit never lets an error cross its `run` boundary: every internal
/// failure becomes an entry in `errors` and flips `success`, while the
/// remaining independent sub-steps still execute.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitReport {
    pub module: Module,
    pub success: bool,
    /// Records written, keyed by record type.
    pub counts: BTreeMap<String, u64>,
    pub errors: Vec<String>,
}

impl UnitReport {
    pub fn new(module: Module) -> Self {
        Self {
            module,
            success: true,
            counts: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    /// Record one appended record of the given type.
    pub fn tally(&mut self, record_type: &str) {
        *self.counts.entry(record_type.to_string()).or_insert(0) += 1;
    }

    /// Record a sub-step failure and keep going.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.success = false;
        self.errors.push(message.into());
    }

    /// Total records written across all types.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// Aggregated outcome of one orchestrated cycle.
///
/// `units` holds the per-unit reports in execution order. A failed unit is
/// reported, never escalated to an abort of the cycle.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub success: bool,
    pub elapsed_ms: u64,
    pub units: Vec<UnitReport>,
}

impl CycleReport {
    pub fn unit(&self, module: Module) -> Option<&UnitReport> {
        self.units.iter().find(|u| u.module == module)
    }
}
