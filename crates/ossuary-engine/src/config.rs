use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Process-wide engine configuration, injected at construction.
///
/// `lambda_resonance` is the cosmetic fixed-point tag stamped on every
/// record (167 displays as 1.67); it carries no correctness logic.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub lambda_resonance: i64,
    /// Miner discovery poll cap.
    pub discovery_batch: usize,
    /// Reaper analysis batch, most-recent-first.
    pub reaper_batch: usize,
    /// Hunter analysis window.
    pub hunter_window: usize,
    pub drift_threshold: f64,
    /// Seeker analysis window (pairwise scan is O(n²) over this).
    pub seeker_window: usize,
    pub similarity_threshold: f64,
    /// Sin-Eater corruption scan cap per invocation.
    pub scan_limit: usize,
    pub briefing_window_days: i64,
    pub timeline_window_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lambda_resonance: 167,
            discovery_batch: 50,
            reaper_batch: 50,
            hunter_window: 100,
            drift_threshold: 30.0,
            seeker_window: 50,
            similarity_threshold: 0.6,
            scan_limit: 500,
            briefing_window_days: 7,
            timeline_window_days: 30,
        }
    }
}

impl EngineConfig {
    /// Reject bad configuration before any store access.
    pub fn validate(&self) -> Result<(), EngineError> {
        fn positive(name: &str, value: usize) -> Result<(), EngineError> {
            if value == 0 {
                return Err(EngineError::Validation(format!("{name} must be positive")));
            }
            Ok(())
        }

        positive("discovery_batch", self.discovery_batch)?;
        positive("reaper_batch", self.reaper_batch)?;
        positive("hunter_window", self.hunter_window)?;
        positive("seeker_window", self.seeker_window)?;
        positive("scan_limit", self.scan_limit)?;

        if !self.drift_threshold.is_finite() || self.drift_threshold < 0.0 {
            return Err(EngineError::Validation(
                "drift_threshold must be a non-negative finite number".to_string(),
            ));
        }
        if !self.similarity_threshold.is_finite()
            || !(0.0..=1.0).contains(&self.similarity_threshold)
        {
            return Err(EngineError::Validation(
                "similarity_threshold must be within [0, 1]".to_string(),
            ));
        }
        if self.briefing_window_days <= 0 || self.timeline_window_days <= 0 {
            return Err(EngineError::Validation(
                "briefing and timeline windows must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
