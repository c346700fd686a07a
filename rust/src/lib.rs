//! Resource over-allocation detection and leveling for CPM schedules.
//!
//! The engine works on an in-memory project snapshot: tasks with CPM dates,
//! resources, assignments and a working calendar. [`service`] wires it to the
//! store, CPM engine and notifier of an embedding application; the functions
//! below expose the pure algorithms to Python.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use chrono::NaiveDate;
use pyo3::prelude::*;

pub mod arena;
pub mod calendar;
mod config;
pub mod detection;
pub mod leveling;
pub mod logging;
mod models;
pub mod service;
pub mod timeline;

pub use arena::{TaskArena, TaskIdx};
pub use calendar::{
    add_work_days, is_work_day, work_dates, CalendarConfig, CalendarException, ExceptionKind,
};
pub use config::{
    LevelingOptions, LevelingOrder, OptionsError, ProjectSettings, DEFAULT_HOURS_PER_DAY,
    MAX_LEVELING_ITERATIONS,
};
pub use detection::detect_over_allocations;
pub use leveling::{compare_for_leveling, level_resources, rank_contributors, ResourceLeveler};
pub use models::{
    DailyUsage, LevelingResult, OverAllocation, Resource, Task, TaskDelay, TaskResourceAssignment,
    TaskType, Termination,
};
pub use service::{LevelingError, LevelingRequest, LevelingResponse, LevelingService};
pub use timeline::build_resource_timeline;

/// Whether `date` is a working day.
///
/// Without a calendar, Monday to Friday are working days.
#[pyfunction]
#[pyo3(name = "is_work_day", signature = (date, calendar=None))]
fn py_is_work_day(date: NaiveDate, calendar: Option<CalendarConfig>) -> bool {
    is_work_day(date, &calendar.unwrap_or_default())
}

/// The date reached after advancing `days` working days from `start`.
#[pyfunction]
#[pyo3(name = "add_work_days", signature = (start, days, calendar=None))]
fn py_add_work_days(start: NaiveDate, days: i64, calendar: Option<CalendarConfig>) -> NaiveDate {
    add_work_days(start, days, &calendar.unwrap_or_default())
}

/// Working dates in `[start, end)`, ascending.
#[pyfunction]
#[pyo3(name = "work_dates", signature = (start, end, calendar=None))]
fn py_work_dates(
    start: NaiveDate,
    end: NaiveDate,
    calendar: Option<CalendarConfig>,
) -> Vec<NaiveDate> {
    let calendar = calendar.unwrap_or_default();
    work_dates(start, end, &calendar).collect()
}

/// Daily hours of one resource against its capacity.
///
/// # Arguments
/// * `resource` - The resource to chart
/// * `assignments` - All assignments; those for other resources are ignored
/// * `tasks` - Tasks with scheduled windows
/// * `calendar` - Working calendar (Monday to Friday when omitted)
/// * `hours_per_day` - Default daily hours per assignment
#[pyfunction]
#[pyo3(
    name = "build_resource_timeline",
    signature = (resource, assignments, tasks, calendar=None, hours_per_day=DEFAULT_HOURS_PER_DAY)
)]
fn py_build_resource_timeline(
    resource: Resource,
    assignments: Vec<TaskResourceAssignment>,
    tasks: Vec<Task>,
    calendar: Option<CalendarConfig>,
    hours_per_day: f64,
) -> Vec<DailyUsage> {
    let tasks = TaskArena::new(tasks);
    build_resource_timeline(
        &resource,
        &assignments,
        &tasks,
        &calendar.unwrap_or_default(),
        hours_per_day,
    )
}

/// Every (resource, date) whose demand exceeds capacity, sorted by date.
#[pyfunction]
#[pyo3(
    name = "detect_over_allocations",
    signature = (resources, assignments, tasks, calendar=None, hours_per_day=DEFAULT_HOURS_PER_DAY)
)]
fn py_detect_over_allocations(
    resources: Vec<Resource>,
    assignments: Vec<TaskResourceAssignment>,
    tasks: Vec<Task>,
    calendar: Option<CalendarConfig>,
    hours_per_day: f64,
) -> Vec<OverAllocation> {
    let tasks = TaskArena::new(tasks);
    detect_over_allocations(
        &resources,
        &assignments,
        &tasks,
        &calendar.unwrap_or_default(),
        hours_per_day,
    )
}

/// Delay tasks until no resource is over-allocated or leveling has to stop.
///
/// # Returns
/// * Tuple of (LevelingResult, tasks with their leveled dates)
#[pyfunction]
#[pyo3(
    name = "level_resources",
    signature = (resources, assignments, tasks, calendar=None, hours_per_day=DEFAULT_HOURS_PER_DAY, options=None)
)]
fn py_level_resources(
    resources: Vec<Resource>,
    assignments: Vec<TaskResourceAssignment>,
    tasks: Vec<Task>,
    calendar: Option<CalendarConfig>,
    hours_per_day: f64,
    options: Option<LevelingOptions>,
) -> (LevelingResult, Vec<Task>) {
    let mut tasks = TaskArena::new(tasks);
    let result = level_resources(
        &resources,
        &assignments,
        &mut tasks,
        &calendar.unwrap_or_default(),
        hours_per_day,
        &options.unwrap_or_default(),
    );
    (result, tasks.into_tasks())
}

/// The leveling_rust Python module.
#[pymodule]
fn leveling_rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Core data types
    m.add_class::<Task>()?;
    m.add_class::<TaskType>()?;
    m.add_class::<Resource>()?;
    m.add_class::<TaskResourceAssignment>()?;
    m.add_class::<DailyUsage>()?;
    m.add_class::<OverAllocation>()?;
    m.add_class::<TaskDelay>()?;
    m.add_class::<Termination>()?;
    m.add_class::<LevelingResult>()?;

    // Config types
    m.add_class::<LevelingOptions>()?;
    m.add_class::<LevelingOrder>()?;
    m.add_class::<CalendarConfig>()?;

    // Algorithms
    m.add_function(wrap_pyfunction!(py_is_work_day, m)?)?;
    m.add_function(wrap_pyfunction!(py_add_work_days, m)?)?;
    m.add_function(wrap_pyfunction!(py_work_dates, m)?)?;
    m.add_function(wrap_pyfunction!(py_build_resource_timeline, m)?)?;
    m.add_function(wrap_pyfunction!(py_detect_over_allocations, m)?)?;
    m.add_function(wrap_pyfunction!(py_level_resources, m)?)?;

    Ok(())
}
