pub mod module;
pub mod report;

pub use module::{Module, Severity};
pub use report::{CycleReport, UnitReport};
