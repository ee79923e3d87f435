pub mod config;
pub mod context;
pub mod cycle;
pub mod error;
pub mod units;

pub use config::EngineConfig;
pub use context::{DiscoverySignal, DiscoverySource, StaticDiscovery, UnitContext};
pub use cycle::CycleRunner;
pub use error::EngineError;
