//! Configuration types for the leveling engine.

use pyo3::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Hours in a working day when the project does not set its own.
pub const DEFAULT_HOURS_PER_DAY: f64 = 8.0;

/// Hard cap on leveling iterations.
pub const MAX_LEVELING_ITERATIONS: u32 = 1000;

/// Errors raised by strict option parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionsError {
    #[error("Unknown leveling order: {0} (expected \"priority\" or \"float\")")]
    UnknownLevelingOrder(String),
}

/// Tie-break used when ranking the tasks that share an over-allocated day.
#[pyclass(eq, eq_int)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelingOrder {
    /// Ascending `sort_order` (author priority).
    Priority,
    /// Descending `total_float`.
    Float,
}

impl Default for LevelingOrder {
    fn default() -> Self {
        Self::Float
    }
}

impl LevelingOrder {
    /// Parse an untyped option value, falling back to the default order.
    pub fn parse_or_default(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Priority => "priority",
            Self::Float => "float",
        }
    }
}

impl FromStr for LevelingOrder {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "priority" => Ok(Self::Priority),
            "float" => Ok(Self::Float),
            _ => Err(OptionsError::UnknownLevelingOrder(s.to_string())),
        }
    }
}

impl fmt::Display for LevelingOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Request payloads are loosely typed; unknown orders default instead of failing.
impl<'de> Deserialize<'de> for LevelingOrder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .as_deref()
            .map(Self::parse_or_default)
            .unwrap_or_default())
    }
}

fn deserialize_respect_critical_path<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

/// Options controlling one leveling run.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelingOptions {
    /// Critical tasks are never chosen as the task to delay.
    #[pyo3(get, set)]
    #[serde(deserialize_with = "deserialize_respect_critical_path")]
    pub respect_critical_path: bool,
    /// Tie-break between non-critical tasks.
    #[pyo3(get, set)]
    pub leveling_order: LevelingOrder,
    /// Iteration cap; reaching it ends the run with a warning.
    #[pyo3(get, set)]
    #[serde(skip)]
    pub max_iterations: u32,
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    #[pyo3(get, set)]
    #[serde(skip)]
    pub verbosity: u8,
}

impl Default for LevelingOptions {
    fn default() -> Self {
        Self {
            respect_critical_path: true,
            leveling_order: LevelingOrder::Float,
            max_iterations: MAX_LEVELING_ITERATIONS,
            verbosity: 0,
        }
    }
}

#[pymethods]
impl LevelingOptions {
    #[new]
    #[pyo3(signature = (
        respect_critical_path=true,
        leveling_order=None,
        max_iterations=MAX_LEVELING_ITERATIONS,
        verbosity=0
    ))]
    fn new(
        respect_critical_path: bool,
        leveling_order: Option<&str>,
        max_iterations: u32,
        verbosity: u8,
    ) -> Self {
        Self {
            respect_critical_path,
            leveling_order: leveling_order
                .map(LevelingOrder::parse_or_default)
                .unwrap_or_default(),
            max_iterations,
            verbosity,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "LevelingOptions(respect_critical_path={}, leveling_order={:?}, max_iterations={})",
            self.respect_critical_path,
            self.leveling_order.as_str(),
            self.max_iterations
        )
    }
}

/// Project-level settings read alongside the task snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSettings {
    pub id: String,
    /// Calendar applied to every task of the project.
    pub default_calendar_id: Option<String>,
    pub hours_per_day: Option<f64>,
}

impl ProjectSettings {
    pub fn effective_hours_per_day(&self) -> f64 {
        self.hours_per_day.unwrap_or(DEFAULT_HOURS_PER_DAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let options = LevelingOptions::default();
        assert!(options.respect_critical_path);
        assert_eq!(options.leveling_order, LevelingOrder::Float);
        assert_eq!(options.max_iterations, 1000);
    }

    #[test]
    fn test_strict_parse_rejects_unknown_order() {
        assert_eq!("priority".parse(), Ok(LevelingOrder::Priority));
        assert_eq!(" Float ".parse(), Ok(LevelingOrder::Float));
        assert_eq!(
            "duration".parse::<LevelingOrder>(),
            Err(OptionsError::UnknownLevelingOrder("duration".to_string()))
        );
    }

    #[test]
    fn test_lenient_parse_defaults_unknown_order() {
        assert_eq!(
            LevelingOrder::parse_or_default("priority"),
            LevelingOrder::Priority
        );
        assert_eq!(
            LevelingOrder::parse_or_default("random"),
            LevelingOrder::Float
        );
    }

    #[test]
    fn test_deserialize_partial_options() {
        let options: LevelingOptions =
            serde_json::from_str(r#"{"leveling_order": "priority"}"#).unwrap();
        assert!(options.respect_critical_path);
        assert_eq!(options.leveling_order, LevelingOrder::Priority);
        assert_eq!(options.max_iterations, MAX_LEVELING_ITERATIONS);

        let options: LevelingOptions = serde_json::from_str(
            r#"{"respect_critical_path": null, "leveling_order": "bogus", "max_iterations": 5}"#,
        )
        .unwrap();
        assert!(options.respect_critical_path);
        assert_eq!(options.leveling_order, LevelingOrder::Float);
        assert_eq!(options.max_iterations, MAX_LEVELING_ITERATIONS);
    }

    #[test]
    fn test_project_hours_fallback() {
        let mut project = ProjectSettings {
            id: "p1".to_string(),
            ..Default::default()
        };
        assert_eq!(project.effective_hours_per_day(), 8.0);
        project.hours_per_day = Some(10.0);
        assert_eq!(project.effective_hours_per_day(), 10.0);
    }
}
