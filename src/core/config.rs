// Caller-owned solver settings. Passed into every solve; nothing is kept
// between puzzles.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{Result, SolverError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Programs kept per depth step
    pub beam_width: usize,

    /// Longest program the synthesizer builds
    pub max_depth: usize,

    /// Stop after this many program evaluations (checked between depth steps)
    pub max_evaluations: Option<usize>,

    /// Wall-clock budget for one synthesis call, in milliseconds
    pub time_limit_ms: Option<u64>,

    /// Try the single-step rule matcher before searching
    pub use_rule_matcher: bool,

    /// Try the diagnostics-driven fallback when search finds nothing exact
    pub use_heuristic_fallback: bool,

    /// Add the training-set color mapping to the library for the task
    pub inferred_color_maps: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            beam_width: 5,
            max_depth: 4,
            max_evaluations: None,
            time_limit_ms: None,
            use_rule_matcher: true,
            use_heuristic_fallback: true,
            inferred_color_maps: true,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.beam_width == 0 {
            return Err(SolverError::InvalidConfig("beam_width must be at least 1".into()));
        }
        if self.max_depth == 0 {
            return Err(SolverError::InvalidConfig("max_depth must be at least 1".into()));
        }
        Ok(())
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: SolverConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_search_parameters() {
        let config = SolverConfig::default();
        assert_eq!(config.beam_width, 5);
        assert_eq!(config.max_depth, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = SolverConfig::from_json_str(r#"{"beam_width": 8}"#).unwrap();
        assert_eq!(config.beam_width, 8);
        assert_eq!(config.max_depth, 4);
        assert!(config.use_rule_matcher);
    }

    #[test]
    fn zero_beam_rejected() {
        assert!(SolverConfig::from_json_str(r#"{"beam_width": 0}"#).is_err());
        let config = SolverConfig { max_depth: 0, ..SolverConfig::default() };
        assert!(matches!(config.validate(), Err(SolverError::InvalidConfig(_))));
    }
}
