use std::time::Instant;

use tracing::{info, instrument};

use ossuary_core::{CycleReport, Module, UnitReport};

use crate::context::UnitContext;
use crate::units::unit_for;

/// Runs a selection of units strictly in `Module::CYCLE_ORDER` within one
/// invocation. Per-unit results are independent: a failed unit is reported
/// and never rolls back or aborts the units around it.
pub struct CycleRunner {
    ctx: UnitContext,
}

impl CycleRunner {
    pub fn new(ctx: UnitContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &UnitContext {
        &self.ctx
    }

    #[instrument(skip_all, fields(selected = selection.len()))]
    pub fn run_cycle(&self, selection: &[Module]) -> CycleReport {
        let started = Instant::now();

        // Iterating the fixed order also drops duplicate selections.
        let mut units = Vec::new();
        for module in Module::CYCLE_ORDER {
            if selection.contains(&module) {
                units.push(self.run_unit(module));
            }
        }

        let success = units.iter().all(|u| u.success);
        let report = CycleReport {
            success,
            elapsed_ms: started.elapsed().as_millis() as u64,
            units,
        };
        info!(
            success = report.success,
            elapsed_ms = report.elapsed_ms,
            units = report.units.len(),
            "cycle complete"
        );
        report
    }

    pub fn run_unit(&self, module: Module) -> UnitReport {
        let report = unit_for(module).run(&self.ctx);
        info!(
            module = %module,
            success = report.success,
            records = report.total(),
            errors = report.errors.len(),
            "unit complete"
        );
        report
    }
}
