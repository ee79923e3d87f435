//! The six batch units. Each is a pure function from "current ledger +
//! external inputs" to zero or more appended records, reported through a
//! `UnitReport`. No unit lets an error cross its `run` boundary.

pub mod analyst;
pub mod hunter;
pub mod miner;
pub mod reaper;
pub mod seeker;
pub mod sin_eater;

use ossuary_core::{Module, UnitReport};

use crate::context::UnitContext;
use crate::error::EngineError;

pub use analyst::Analyst;
pub use hunter::Hunter;
pub use miner::Miner;
pub use reaper::Reaper;
pub use seeker::Seeker;
pub use sin_eater::SinEater;

/// One named batch processor.
pub trait Unit {
    fn module(&self) -> Module;
    fn run(&self, ctx: &UnitContext) -> UnitReport;
}

/// Factory keyed by producer module.
pub fn unit_for(module: Module) -> Box<dyn Unit> {
    match module {
        Module::Miner => Box::new(Miner),
        Module::Reaper => Box::new(Reaper),
        Module::Hunter => Box::new(Hunter),
        Module::Seeker => Box::new(Seeker),
        Module::SinEater => Box::new(SinEater),
        Module::Analyst => Box::new(Analyst),
    }
}

/// Shared sub-step loop: run each named step, converting a failure into a
/// report error and moving on. One bad step must not block its siblings.
pub(crate) fn run_steps<'a>(
    report: &mut UnitReport,
    steps: Vec<(&'static str, Box<dyn FnOnce(&mut UnitReport) -> Result<(), EngineError> + 'a>)>,
) {
    for (name, step) in steps {
        if let Err(e) = step(report) {
            report.fail(format!("{name}: {e}"));
        }
    }
}
