//! Priority-based heuristic leveling loop.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use crate::arena::TaskArena;
use crate::calendar::{add_work_days, CalendarConfig};
use crate::config::LevelingOptions;
use crate::detection::detect_over_allocations;
use crate::models::{
    LevelingResult, OverAllocation, Resource, TaskDelay, TaskResourceAssignment, Termination,
};
use crate::{log_changes, log_checks, log_debug};

use super::ranking::rank_contributors;

/// Delays tasks one working day at a time until no resource is over-allocated.
///
/// Each round detects conflicts against the current task dates, takes the
/// chronologically first one, and pushes its least-protected task. The run
/// stops when nothing conflicts, when only protected critical tasks are left
/// in a conflict, when the chosen task cannot move, or at the iteration cap.
pub struct ResourceLeveler<'a> {
    resources: &'a [Resource],
    assignments: &'a [TaskResourceAssignment],
    calendar: &'a CalendarConfig,
    hours_per_day: f64,
    options: LevelingOptions,
}

/// Delay ledger keyed by task id, kept in order of first delay.
#[derive(Default)]
struct DelayLedger {
    entries: Vec<TaskDelay>,
    positions: FxHashMap<String, usize>,
}

impl DelayLedger {
    fn record(&mut self, task_id: &str, original_start: NaiveDate, new_start: NaiveDate) {
        if let Some(&pos) = self.positions.get(task_id) {
            let entry = &mut self.entries[pos];
            entry.new_start = new_start;
            entry.delay_days += 1;
            return;
        }
        self.positions.insert(task_id.to_string(), self.entries.len());
        self.entries.push(TaskDelay {
            task_id: task_id.to_string(),
            original_start,
            new_start,
            delay_days: 1,
        });
    }
}

/// Outcome of a single leveling round.
enum Step {
    Delayed,
    Stop(Termination, String),
}

impl<'a> ResourceLeveler<'a> {
    pub fn new(
        resources: &'a [Resource],
        assignments: &'a [TaskResourceAssignment],
        calendar: &'a CalendarConfig,
        hours_per_day: f64,
        options: LevelingOptions,
    ) -> Self {
        Self {
            resources,
            assignments,
            calendar,
            hours_per_day,
            options,
        }
    }

    fn detect(&self, tasks: &TaskArena) -> Vec<OverAllocation> {
        detect_over_allocations(
            self.resources,
            self.assignments,
            tasks,
            self.calendar,
            self.hours_per_day,
        )
    }

    /// Run the loop, moving tasks in `tasks` in place.
    pub fn level(&self, tasks: &mut TaskArena) -> LevelingResult {
        let verbosity = self.options.verbosity;
        let mut ledger = DelayLedger::default();
        let mut warnings: Vec<String> = Vec::new();
        let mut iterations: u32 = 0;
        let mut resolved: u32 = 0;

        let termination = loop {
            let conflicts = self.detect(tasks);
            log_debug!(
                verbosity,
                "Iteration {}: {} over-allocations",
                iterations,
                conflicts.len()
            );
            let Some(conflict) = conflicts.into_iter().next() else {
                break Termination::Converged;
            };

            if iterations >= self.options.max_iterations {
                warnings.push(format!(
                    "Circuit breaker: reached {} iterations. Some over-allocations may remain.",
                    self.options.max_iterations
                ));
                break Termination::Capped;
            }
            iterations += 1;

            match self.delay_one(&conflict, tasks, &mut ledger) {
                Step::Delayed => resolved += 1,
                Step::Stop(termination, warning) => {
                    warnings.push(warning);
                    break termination;
                }
            }
        };

        let remaining = self.detect(tasks).len() as u32;
        log_changes!(
            verbosity,
            "Leveling finished ({:?}): {} tasks delayed, {} steps, {} conflicts remaining",
            termination,
            ledger.entries.len(),
            resolved,
            remaining
        );

        LevelingResult {
            delays: ledger.entries,
            resolved,
            remaining,
            iterations,
            warnings,
            termination,
        }
    }

    /// Delay the least-protected task of `conflict` by one working day.
    fn delay_one(
        &self,
        conflict: &OverAllocation,
        tasks: &mut TaskArena,
        ledger: &mut DelayLedger,
    ) -> Step {
        let verbosity = self.options.verbosity;
        let ranked = rank_contributors(&conflict.conflicting_task_ids, tasks, &self.options);
        log_checks!(
            verbosity,
            "Conflict on {} for {}: {:.1}h of {:.1}h, ranked {:?}",
            conflict.date,
            conflict.resource_name,
            conflict.allocated_hours,
            conflict.capacity,
            ranked.iter().map(|(_, t)| t.id.as_str()).collect::<Vec<_>>()
        );

        let Some(&(idx, victim)) = ranked.last() else {
            return Step::Stop(
                Termination::Stalled,
                format!(
                    "Could not resolve over-allocation for {} on {}",
                    conflict.resource_name, conflict.date
                ),
            );
        };

        if self.options.respect_critical_path && victim.is_critical {
            return Step::Stop(
                Termination::Blocked,
                format!(
                    "All conflicting tasks on {} for {} are critical; cannot level without extending the project",
                    conflict.date, conflict.resource_name
                ),
            );
        }

        let Some(current_start) = victim.early_start else {
            return Step::Stop(
                Termination::Stalled,
                format!("Task {} has no early_start; skipping", victim.id),
            );
        };

        let new_start = add_work_days(current_start, 1, self.calendar);
        if new_start == current_start {
            return Step::Stop(
                Termination::Stalled,
                format!(
                    "Task {} cannot be delayed past {}: the calendar has no later working day",
                    victim.id, current_start
                ),
            );
        }
        let new_finish = match victim.original_duration {
            Some(duration) if duration > 0 => add_work_days(new_start, duration, self.calendar),
            _ => new_start,
        };
        let task_id = victim.id.clone();

        tasks.reschedule(idx, new_start, new_finish);
        ledger.record(&task_id, current_start, new_start);
        log_changes!(
            verbosity,
            "Delayed {} from {} to {} (finish {})",
            task_id,
            current_start,
            new_start,
            new_finish
        );
        Step::Delayed
    }
}

/// Level `tasks` in place and report what was moved.
pub fn level_resources(
    resources: &[Resource],
    assignments: &[TaskResourceAssignment],
    tasks: &mut TaskArena,
    calendar: &CalendarConfig,
    hours_per_day: f64,
    options: &LevelingOptions,
) -> LevelingResult {
    ResourceLeveler::new(resources, assignments, calendar, hours_per_day, options.clone())
        .level(tasks)
}
