//! Request and response payloads of a leveling run.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::config::LevelingOptions;
use crate::models::{DailyUsage, LevelingResult, OverAllocation};

fn level_by_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

fn default_level() -> bool {
    true
}

/// A request to check, and optionally level, one project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelingRequest {
    #[serde(default)]
    pub project_id: Option<String>,
    /// Run the leveler when conflicts exist; detection only otherwise.
    #[serde(default = "default_level", deserialize_with = "level_by_default")]
    pub level: bool,
    #[serde(default)]
    pub options: LevelingOptions,
}

impl LevelingRequest {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            level: true,
            options: LevelingOptions::default(),
        }
    }
}

/// What the run found and did, for callers that branch on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelingOutcome {
    /// No tasks, resources or assignments to look at.
    NoData,
    NoConflicts,
    /// Conflicts exist and leveling was not requested.
    ConflictsNotLeveled,
    Resolved,
    /// Leveling stopped with conflicts left; see the warnings.
    PartiallyResolved,
}

/// A delayed task whose new dates could not be saved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceFailure {
    pub task_id: String,
    pub reason: String,
}

/// Leveling section of the response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelingSummary {
    #[serde(flatten)]
    pub result: LevelingResult,
    /// Failed date writes, kept apart from the algorithm's warnings.
    pub persistence_failures: Vec<PersistenceFailure>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelingResponse {
    pub success: bool,
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub outcome: LevelingOutcome,
    /// Conflicts found before any leveling.
    pub over_allocations: Vec<OverAllocation>,
    pub over_allocation_count: usize,
    pub leveling: Option<LevelingSummary>,
    /// Daily usage per resource id after the run; idle resources are omitted.
    pub histogram: BTreeMap<String, Vec<DailyUsage>>,
}

impl LevelingResponse {
    /// Successful response for a project with nothing to level.
    pub fn empty(project_id: &str, message: &str) -> Self {
        Self {
            success: true,
            project_id: project_id.to_string(),
            message: Some(message.to_string()),
            outcome: LevelingOutcome::NoData,
            over_allocations: Vec::new(),
            over_allocation_count: 0,
            leveling: None,
            histogram: BTreeMap::new(),
        }
    }

    pub fn tasks_delayed(&self) -> usize {
        self.leveling
            .as_ref()
            .map_or(0, |summary| summary.result.delays.len())
    }
}
