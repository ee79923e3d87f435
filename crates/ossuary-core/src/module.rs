use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The six producer units, in their fixed cycle order.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Module {
    Miner,
    Reaper,
    Hunter,
    Seeker,
    SinEater,
    Analyst,
}

impl Module {
    /// Fixed execution order for a cycle. Sin-Eater's lag check compares
    /// Miner's and Reaper's latest timestamps, so it must run after both.
    pub const CYCLE_ORDER: [Module; 6] = [
        Module::Miner,
        Module::Reaper,
        Module::Hunter,
        Module::Seeker,
        Module::SinEater,
        Module::Analyst,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Miner => "MINER",
            Module::Reaper => "REAPER",
            Module::Hunter => "HUNTER",
            Module::Seeker => "SEEKER",
            Module::SinEater => "SIN_EATER",
            Module::Analyst => "ANALYST",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MINER" => Ok(Module::Miner),
            "REAPER" => Ok(Module::Reaper),
            "HUNTER" => Ok(Module::Hunter),
            "SEEKER" => Ok(Module::Seeker),
            "SIN_EATER" => Ok(Module::SinEater),
            "ANALYST" => Ok(Module::Analyst),
            other => Err(format!("unknown module: {other}")),
        }
    }
}

/// Record severity, declared most-urgent-first so the derived `Ord`
/// sorts by descending urgency.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Info => "INFO",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CRITICAL" => Ok(Severity::Critical),
            "HIGH" => Ok(Severity::High),
            "MEDIUM" => Ok(Severity::Medium),
            "LOW" => Ok(Severity::Low),
            "INFO" => Ok(Severity::Info),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_display_and_from_str_roundtrip() {
        for module in Module::CYCLE_ORDER {
            let parsed: Module = module.as_str().parse().unwrap();
            assert_eq!(parsed, module);
        }
    }

    #[test]
    fn sin_eater_wire_form() {
        assert_eq!(Module::SinEater.as_str(), "SIN_EATER");
        let json = serde_json::to_string(&Module::SinEater).unwrap();
        assert_eq!(json, "\"SIN_EATER\"");
    }

    #[test]
    fn unknown_module_rejected() {
        assert!("ORACLE".parse::<Module>().is_err());
    }

    #[test]
    fn severity_orders_by_descending_urgency() {
        let mut severities = vec![
            Severity::Low,
            Severity::Critical,
            Severity::Info,
            Severity::High,
            Severity::Medium,
        ];
        severities.sort();
        assert_eq!(
            severities,
            vec![
                Severity::Critical,
                Severity::High,
                Severity::Medium,
                Severity::Low,
                Severity::Info,
            ]
        );
    }

    #[test]
    fn severity_serde_roundtrip() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"CRITICAL\"");
        let parsed: Severity = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Severity::Critical);
    }

    #[test]
    fn cycle_order_is_stable() {
        assert_eq!(Module::CYCLE_ORDER[0], Module::Miner);
        assert_eq!(Module::CYCLE_ORDER[4], Module::SinEater);
        assert_eq!(Module::CYCLE_ORDER[5], Module::Analyst);
    }
}
