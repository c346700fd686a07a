//! Interfaces to the systems around the engine.
//!
//! The embedding application implements these; the engine itself performs no
//! I/O. All calls are synchronous and made from the request's own thread.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::CalendarException;
use crate::config::ProjectSettings;
use crate::models::{Resource, Task, TaskResourceAssignment};

/// Failure reported by a collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Read and write access to the project snapshot.
pub trait ScheduleStore {
    /// Project settings, or `None` when the project does not exist for the caller.
    fn load_project(&self, project_id: &str) -> Result<Option<ProjectSettings>, CollaboratorError>;

    /// Live tasks of the project, with CPM dates and float already computed.
    fn load_tasks(&self, project_id: &str) -> Result<Vec<Task>, CollaboratorError>;

    /// Resources available to the project, in a stable order.
    fn load_resources(&self, project_id: &str) -> Result<Vec<Resource>, CollaboratorError>;

    /// Assignments whose task is one of `task_ids`.
    fn load_assignments(
        &self,
        task_ids: &[String],
    ) -> Result<Vec<TaskResourceAssignment>, CollaboratorError>;

    /// Weekly mask of a calendar, or `None` when the calendar row is missing.
    fn load_calendar_mask(&self, calendar_id: &str) -> Result<Option<u8>, CollaboratorError>;

    fn load_calendar_exceptions(
        &self,
        calendar_id: &str,
    ) -> Result<Vec<CalendarException>, CollaboratorError>;

    /// Persist a task's new window. Called once per delayed task.
    fn update_task_dates(
        &self,
        task_id: &str,
        early_start: NaiveDate,
        early_finish: NaiveDate,
    ) -> Result<(), CollaboratorError>;

    fn append_change_log(&self, entry: &ChangeLogEntry) -> Result<(), CollaboratorError>;
}

/// Result of asking the CPM engine to recompute a project.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CpmOutcome {
    Ok,
    Failed(String),
}

/// The critical path engine that owns float and criticality.
pub trait CpmEngine {
    /// Recompute and persist early dates, float and criticality for every task.
    fn recalculate(&self, project_id: &str) -> CpmOutcome;
}

/// Fire-and-forget delivery of run events.
pub trait Notifier {
    fn publish(&self, event: &LevelingEvent) -> Result<(), CollaboratorError>;
}

impl<T: ScheduleStore + ?Sized> ScheduleStore for &T {
    fn load_project(&self, project_id: &str) -> Result<Option<ProjectSettings>, CollaboratorError> {
        (**self).load_project(project_id)
    }

    fn load_tasks(&self, project_id: &str) -> Result<Vec<Task>, CollaboratorError> {
        (**self).load_tasks(project_id)
    }

    fn load_resources(&self, project_id: &str) -> Result<Vec<Resource>, CollaboratorError> {
        (**self).load_resources(project_id)
    }

    fn load_assignments(
        &self,
        task_ids: &[String],
    ) -> Result<Vec<TaskResourceAssignment>, CollaboratorError> {
        (**self).load_assignments(task_ids)
    }

    fn load_calendar_mask(&self, calendar_id: &str) -> Result<Option<u8>, CollaboratorError> {
        (**self).load_calendar_mask(calendar_id)
    }

    fn load_calendar_exceptions(
        &self,
        calendar_id: &str,
    ) -> Result<Vec<CalendarException>, CollaboratorError> {
        (**self).load_calendar_exceptions(calendar_id)
    }

    fn update_task_dates(
        &self,
        task_id: &str,
        early_start: NaiveDate,
        early_finish: NaiveDate,
    ) -> Result<(), CollaboratorError> {
        (**self).update_task_dates(task_id, early_start, early_finish)
    }

    fn append_change_log(&self, entry: &ChangeLogEntry) -> Result<(), CollaboratorError> {
        (**self).append_change_log(entry)
    }
}

impl<T: CpmEngine + ?Sized> CpmEngine for &T {
    fn recalculate(&self, project_id: &str) -> CpmOutcome {
        (**self).recalculate(project_id)
    }
}

impl<T: Notifier + ?Sized> Notifier for &T {
    fn publish(&self, event: &LevelingEvent) -> Result<(), CollaboratorError> {
        (**self).publish(event)
    }
}

/// Audit entry appended after a run that moved tasks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub project_id: String,
    /// First task of the project snapshot; the log is keyed per task.
    pub task_id: String,
    pub change_type: String,
    pub source: String,
    pub notes: String,
}

impl ChangeLogEntry {
    pub const SOURCE: &'static str = "resource_level";

    pub fn leveling(
        project_id: &str,
        task_id: &str,
        tasks_delayed: usize,
        resolved: u32,
        iterations: u32,
    ) -> Self {
        Self {
            project_id: project_id.to_string(),
            task_id: task_id.to_string(),
            change_type: "updated".to_string(),
            source: Self::SOURCE.to_string(),
            notes: format!(
                "Resource leveling: {} tasks delayed, {} conflicts resolved in {} iterations",
                tasks_delayed, resolved, iterations
            ),
        }
    }
}

/// Broadcast once a run has finished.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelingEvent {
    pub project_id: String,
    pub over_allocation_count: usize,
    pub tasks_delayed: usize,
    pub leveled_at: DateTime<Utc>,
}

impl LevelingEvent {
    /// Channel the event is published on.
    pub fn channel(&self) -> String {
        format!("schedule:{}", self.project_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_log_notes() {
        let entry = ChangeLogEntry::leveling("p1", "t1", 2, 5, 6);
        assert_eq!(entry.source, "resource_level");
        assert_eq!(
            entry.notes,
            "Resource leveling: 2 tasks delayed, 5 conflicts resolved in 6 iterations"
        );
    }

    #[test]
    fn test_event_channel() {
        let event = LevelingEvent {
            project_id: "p1".to_string(),
            over_allocation_count: 3,
            tasks_delayed: 1,
            leveled_at: Utc::now(),
        };
        assert_eq!(event.channel(), "schedule:p1");
    }
}
