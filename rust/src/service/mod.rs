//! Request-level driver for detection and leveling.
//!
//! Loads one project snapshot, reports conflicts, levels when asked, writes the
//! moved dates back, asks the CPM engine to refresh float, rebuilds histograms
//! and broadcasts a completion event. Runs for the same project must be
//! serialized by the caller; nothing here guards against concurrent writers.

mod collaborators;
mod request;

pub use collaborators::{
    ChangeLogEntry, CollaboratorError, CpmEngine, CpmOutcome, LevelingEvent, Notifier,
    ScheduleStore,
};
pub use request::{
    LevelingOutcome, LevelingRequest, LevelingResponse, LevelingSummary, PersistenceFailure,
};

use chrono::Utc;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::arena::TaskArena;
use crate::calendar::{CalendarConfig, MASK_MON_FRI};
use crate::config::{LevelingOptions, ProjectSettings};
use crate::detection::detect_over_allocations;
use crate::leveling::ResourceLeveler;
use crate::models::{DailyUsage, LevelingResult, Resource, TaskResourceAssignment};
use crate::timeline::build_resource_timeline;
use crate::{log_changes, log_checks, log_warning};

/// Errors that reject a request.
///
/// Algorithmic stops and collaborator hiccups after leveling are reported
/// inside a successful response instead.
#[derive(Error, Debug)]
pub enum LevelingError {
    #[error("Missing project_id")]
    MissingProjectId,
    #[error("Project not found: {0}")]
    ProjectNotFound(String),
    #[error("Failed to load project data: {0}")]
    Store(#[from] CollaboratorError),
}

impl LevelingError {
    /// Whether the caller is at fault.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Store(_))
    }

    /// HTTP-style status for transports that need one.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingProjectId => 400,
            Self::ProjectNotFound(_) => 404,
            Self::Store(_) => 500,
        }
    }
}

/// Everything a run reads, loaded once up front.
struct ProjectSnapshot {
    settings: ProjectSettings,
    tasks: TaskArena,
    resources: Vec<Resource>,
    assignments: Vec<TaskResourceAssignment>,
    calendar: CalendarConfig,
}

/// Snapshot loading either yields data or a reason to stop early.
enum Loaded {
    Snapshot(ProjectSnapshot),
    Empty(&'static str),
}

pub struct LevelingService<S, C, N> {
    store: S,
    cpm: C,
    notifier: N,
}

impl<S, C, N> LevelingService<S, C, N>
where
    S: ScheduleStore,
    C: CpmEngine,
    N: Notifier,
{
    pub fn new(store: S, cpm: C, notifier: N) -> Self {
        Self {
            store,
            cpm,
            notifier,
        }
    }

    /// Handle one request end to end.
    pub fn run(&self, request: &LevelingRequest) -> Result<LevelingResponse, LevelingError> {
        let project_id = request
            .project_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(LevelingError::MissingProjectId)?;
        let options = &request.options;

        let mut snapshot = match self.load_snapshot(project_id, options.verbosity)? {
            Loaded::Snapshot(snapshot) => snapshot,
            Loaded::Empty(message) => return Ok(LevelingResponse::empty(project_id, message)),
        };
        let hours_per_day = snapshot.settings.effective_hours_per_day();

        let over_allocations = detect_over_allocations(
            &snapshot.resources,
            &snapshot.assignments,
            &snapshot.tasks,
            &snapshot.calendar,
            hours_per_day,
        );
        log_checks!(
            options.verbosity,
            "Project {}: {} over-allocations before leveling",
            project_id,
            over_allocations.len()
        );

        let leveling = if request.level && !over_allocations.is_empty() {
            let result = ResourceLeveler::new(
                &snapshot.resources,
                &snapshot.assignments,
                &snapshot.calendar,
                hours_per_day,
                options.clone(),
            )
            .level(&mut snapshot.tasks);
            Some(self.apply(project_id, &snapshot, result, options))
        } else {
            None
        };

        let histogram = build_histogram(&snapshot, hours_per_day);
        let outcome = match &leveling {
            _ if over_allocations.is_empty() => LevelingOutcome::NoConflicts,
            None => LevelingOutcome::ConflictsNotLeveled,
            Some(summary) if summary.result.remaining == 0 => LevelingOutcome::Resolved,
            Some(_) => LevelingOutcome::PartiallyResolved,
        };

        let response = LevelingResponse {
            success: true,
            project_id: project_id.to_string(),
            message: None,
            outcome,
            over_allocation_count: over_allocations.len(),
            over_allocations,
            leveling,
            histogram,
        };
        self.broadcast(&response);
        Ok(response)
    }

    fn load_snapshot(&self, project_id: &str, verbosity: u8) -> Result<Loaded, LevelingError> {
        let settings = self
            .store
            .load_project(project_id)?
            .ok_or_else(|| LevelingError::ProjectNotFound(project_id.to_string()))?;

        let tasks = self.store.load_tasks(project_id)?;
        if tasks.is_empty() {
            return Ok(Loaded::Empty("No tasks to level"));
        }
        let tasks = TaskArena::new(tasks);

        let resources = self.store.load_resources(project_id)?;
        if resources.is_empty() {
            return Ok(Loaded::Empty("No resources defined"));
        }

        let assignments = self.store.load_assignments(&tasks.ids())?;
        if assignments.is_empty() {
            return Ok(Loaded::Empty("No resource assignments"));
        }

        let calendar = self.load_calendar(&settings)?;
        log_checks!(
            verbosity,
            "Loaded project {}: {} tasks, {} resources, {} assignments",
            project_id,
            tasks.len(),
            resources.len(),
            assignments.len()
        );

        Ok(Loaded::Snapshot(ProjectSnapshot {
            settings,
            tasks,
            resources,
            assignments,
            calendar,
        }))
    }

    /// The project's default calendar, or Monday to Friday when it has none.
    fn load_calendar(&self, settings: &ProjectSettings) -> Result<CalendarConfig, LevelingError> {
        let Some(calendar_id) = settings.default_calendar_id.as_deref() else {
            return Ok(CalendarConfig::default());
        };

        let mask = self
            .store
            .load_calendar_mask(calendar_id)?
            .unwrap_or(MASK_MON_FRI);
        let exceptions = self.store.load_calendar_exceptions(calendar_id)?;
        let calendar = CalendarConfig::from_exceptions(mask, &exceptions);

        let overlapping = calendar.conflicting_dates();
        if !overlapping.is_empty() {
            log_warning!(
                "calendar {} lists {} date(s) as both exception and overtime; treating them as non-working: {:?}",
                calendar_id,
                overlapping.len(),
                overlapping
            );
        }
        Ok(calendar)
    }

    /// Persist moved tasks, refresh CPM and write the audit entry.
    fn apply(
        &self,
        project_id: &str,
        snapshot: &ProjectSnapshot,
        mut result: LevelingResult,
        options: &LevelingOptions,
    ) -> LevelingSummary {
        let mut persistence_failures = Vec::new();
        if result.delays.is_empty() {
            return LevelingSummary {
                result,
                persistence_failures,
            };
        }

        for delay in &result.delays {
            let Some((start, finish)) = snapshot.tasks.get(&delay.task_id).and_then(|t| t.window())
            else {
                continue;
            };
            match self.store.update_task_dates(&delay.task_id, start, finish) {
                Ok(()) => log_changes!(
                    options.verbosity,
                    "Saved {}: {} to {}",
                    delay.task_id,
                    start,
                    finish
                ),
                Err(err) => {
                    log_warning!("failed to save dates for task {}: {}", delay.task_id, err);
                    persistence_failures.push(PersistenceFailure {
                        task_id: delay.task_id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        if let CpmOutcome::Failed(reason) = self.cpm.recalculate(project_id) {
            result.warnings.push(format!(
                "CPM recalculation after leveling failed; dates may be inconsistent ({})",
                reason
            ));
        }

        if let Some(first) = snapshot.tasks.tasks().first() {
            let entry = ChangeLogEntry::leveling(
                project_id,
                &first.id,
                result.delays.len(),
                result.resolved,
                result.iterations,
            );
            if let Err(err) = self.store.append_change_log(&entry) {
                log_warning!("failed to append change log for project {}: {}", project_id, err);
            }
        }

        LevelingSummary {
            result,
            persistence_failures,
        }
    }

    fn broadcast(&self, response: &LevelingResponse) {
        let event = LevelingEvent {
            project_id: response.project_id.clone(),
            over_allocation_count: response.over_allocation_count,
            tasks_delayed: response.tasks_delayed(),
            leveled_at: Utc::now(),
        };
        if let Err(err) = self.notifier.publish(&event) {
            log_warning!("failed to publish on {}: {}", event.channel(), err);
        }
    }
}

fn build_histogram(
    snapshot: &ProjectSnapshot,
    hours_per_day: f64,
) -> BTreeMap<String, Vec<DailyUsage>> {
    snapshot
        .resources
        .iter()
        .filter_map(|resource| {
            let timeline = build_resource_timeline(
                resource,
                &snapshot.assignments,
                &snapshot.tasks,
                &snapshot.calendar,
                hours_per_day,
            );
            (!timeline.is_empty()).then(|| (resource.id.clone(), timeline))
        })
        .collect()
}
