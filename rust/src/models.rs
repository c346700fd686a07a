//! Core data types for the leveling engine.

use chrono::NaiveDate;
use pyo3::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of a schedule task.
#[pyclass(eq, eq_int)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// Groups child tasks; never consumes resource hours.
    Summary,
    /// Zero-length marker; never consumes resource hours.
    Milestone,
    /// Any other stored type, including `task`.
    #[serde(other)]
    Normal,
}

/// A unit of work as scheduled by the CPM engine.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[pyo3(get, set)]
    pub id: String,
    #[pyo3(get, set)]
    pub parent_id: Option<String>,
    #[pyo3(get, set)]
    pub task_type: TaskType,
    /// Planned duration in working days.
    #[pyo3(get, set)]
    pub original_duration: Option<i64>,
    /// Start of the half-open scheduled window.
    #[pyo3(get, set)]
    pub early_start: Option<NaiveDate>,
    /// End (exclusive) of the half-open scheduled window.
    #[pyo3(get, set)]
    pub early_finish: Option<NaiveDate>,
    #[pyo3(get, set)]
    pub total_float: Option<f64>,
    #[pyo3(get, set)]
    pub is_critical: bool,
    /// Author-assigned priority, lower = more important.
    #[pyo3(get, set)]
    pub sort_order: i32,
    #[pyo3(get, set)]
    pub calendar_id: Option<String>,
}

impl Task {
    /// Summary and milestone tasks carry no resource demand.
    pub fn consumes_resources(&self) -> bool {
        self.task_type == TaskType::Normal
    }

    /// The `[early_start, early_finish)` window, if both ends are resolved.
    pub fn window(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.early_start?, self.early_finish?))
    }
}

#[pymethods]
impl Task {
    #[new]
    #[pyo3(signature = (
        id,
        early_start=None,
        early_finish=None,
        original_duration=None,
        task_type=TaskType::Normal,
        total_float=None,
        is_critical=false,
        sort_order=0,
        parent_id=None,
        calendar_id=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        id: String,
        early_start: Option<NaiveDate>,
        early_finish: Option<NaiveDate>,
        original_duration: Option<i64>,
        task_type: TaskType,
        total_float: Option<f64>,
        is_critical: bool,
        sort_order: i32,
        parent_id: Option<String>,
        calendar_id: Option<String>,
    ) -> Self {
        Self {
            id,
            parent_id,
            task_type,
            original_duration,
            early_start,
            early_finish,
            total_float,
            is_critical,
            sort_order,
            calendar_id,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Task(id={:?}, early_start={:?}, early_finish={:?}, critical={})",
            self.id, self.early_start, self.early_finish, self.is_critical
        )
    }
}

/// A shared capacity unit (crew, piece of equipment).
#[pyclass]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[pyo3(get, set)]
    pub id: String,
    #[pyo3(get, set)]
    pub name: String,
    #[pyo3(get, set)]
    pub resource_type: String,
    /// Units that can work in parallel.
    #[pyo3(get, set)]
    pub max_units: f64,
    #[pyo3(get, set)]
    pub cost_per_hour: f64,
    #[pyo3(get, set)]
    pub calendar_id: Option<String>,
}

#[pymethods]
impl Resource {
    #[new]
    #[pyo3(signature = (
        id,
        name,
        max_units=1.0,
        resource_type="labor".to_string(),
        cost_per_hour=0.0,
        calendar_id=None
    ))]
    fn new(
        id: String,
        name: String,
        max_units: f64,
        resource_type: String,
        cost_per_hour: f64,
        calendar_id: Option<String>,
    ) -> Self {
        Self {
            id,
            name,
            resource_type,
            max_units,
            cost_per_hour,
            calendar_id,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Resource(id={:?}, name={:?}, max_units={})",
            self.id, self.name, self.max_units
        )
    }
}

/// Edge between a task and a resource it draws on.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskResourceAssignment {
    #[pyo3(get, set)]
    pub task_id: String,
    #[pyo3(get, set)]
    pub resource_id: String,
    #[pyo3(get, set)]
    pub units_assigned: f64,
    /// Explicit daily hours; overrides `units_assigned * hours_per_day`.
    #[pyo3(get, set)]
    pub hours_per_day: Option<f64>,
}

impl TaskResourceAssignment {
    /// Hours this assignment demands on each working day of its task.
    pub fn daily_hours(&self, default_hours_per_day: f64) -> f64 {
        self.hours_per_day
            .unwrap_or(self.units_assigned * default_hours_per_day)
    }
}

#[pymethods]
impl TaskResourceAssignment {
    #[new]
    #[pyo3(signature = (task_id, resource_id, units_assigned=1.0, hours_per_day=None))]
    fn new(
        task_id: String,
        resource_id: String,
        units_assigned: f64,
        hours_per_day: Option<f64>,
    ) -> Self {
        Self {
            task_id,
            resource_id,
            units_assigned,
            hours_per_day,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "TaskResourceAssignment(task_id={:?}, resource_id={:?}, units={})",
            self.task_id, self.resource_id, self.units_assigned
        )
    }
}

/// Demand against one resource on one date.
#[pyclass(get_all)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyUsage {
    pub date: NaiveDate,
    pub hours: f64,
    pub capacity: f64,
    pub over_allocated: bool,
}

#[pymethods]
impl DailyUsage {
    fn __repr__(&self) -> String {
        format!(
            "DailyUsage(date={}, hours={}, capacity={})",
            self.date, self.hours, self.capacity
        )
    }
}

/// A date on which a resource is committed beyond its capacity.
#[pyclass(get_all)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverAllocation {
    pub resource_id: String,
    pub resource_name: String,
    pub date: NaiveDate,
    pub allocated_hours: f64,
    pub capacity: f64,
    pub excess_hours: f64,
    /// Tasks demanding hours on this date, in assignment order.
    pub conflicting_task_ids: Vec<String>,
}

#[pymethods]
impl OverAllocation {
    fn __repr__(&self) -> String {
        format!(
            "OverAllocation(resource={:?}, date={}, allocated={}, capacity={}, tasks={})",
            self.resource_name,
            self.date,
            self.allocated_hours,
            self.capacity,
            self.conflicting_task_ids.len()
        )
    }
}

/// Cumulative delay applied to one task during a leveling run.
#[pyclass(get_all)]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDelay {
    pub task_id: String,
    pub original_start: NaiveDate,
    pub new_start: NaiveDate,
    /// Working days the task was pushed.
    pub delay_days: u32,
}

/// Why a leveling run stopped.
#[pyclass(eq, eq_int)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Termination {
    /// No over-allocation remains.
    Converged,
    /// A conflict could only be fixed by delaying a protected task.
    Blocked,
    /// The chosen task could not be moved: it is unknown, has no start, or the
    /// calendar has no working day after it.
    Stalled,
    /// The iteration cap was reached.
    Capped,
}

/// Record of what a leveling run did.
#[pyclass(get_all)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelingResult {
    /// One entry per delayed task, in order of first delay.
    pub delays: Vec<TaskDelay>,
    /// Delay steps applied.
    pub resolved: u32,
    /// Over-allocations left after the run.
    pub remaining: u32,
    pub iterations: u32,
    pub warnings: Vec<String>,
    pub termination: Termination,
}

impl Default for LevelingResult {
    fn default() -> Self {
        Self {
            delays: Vec::new(),
            resolved: 0,
            remaining: 0,
            iterations: 0,
            warnings: Vec::new(),
            termination: Termination::Converged,
        }
    }
}

#[pymethods]
impl LevelingResult {
    fn __repr__(&self) -> String {
        format!(
            "LevelingResult(delays={}, resolved={}, remaining={}, iterations={}, termination={:?})",
            self.delays.len(),
            self.resolved,
            self.remaining,
            self.iterations,
            self.termination
        )
    }
}
