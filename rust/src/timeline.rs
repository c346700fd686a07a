//! Per-resource daily usage timelines.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::arena::TaskArena;
use crate::calendar::{work_dates, CalendarConfig};
use crate::models::{DailyUsage, Resource, TaskResourceAssignment};

/// Hours demanded on one date, with the tasks demanding them.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct DayDemand {
    pub hours: f64,
    pub task_ids: Vec<String>,
}

/// Hours a resource can supply on any date.
pub fn resource_capacity(resource: &Resource, hours_per_day: f64) -> f64 {
    resource.max_units * hours_per_day
}

/// Expand the given assignments into per-date demand, sorted by date.
///
/// Assignments of summary or milestone tasks, of unknown tasks, and of tasks
/// without a resolved window are ignored. A task appears at most once per date
/// in `task_ids`, in assignment order.
pub(crate) fn accumulate_demand<'a, I>(
    assignments: I,
    tasks: &TaskArena,
    calendar: &CalendarConfig,
    hours_per_day: f64,
) -> BTreeMap<NaiveDate, DayDemand>
where
    I: IntoIterator<Item = &'a TaskResourceAssignment>,
{
    let mut demand: BTreeMap<NaiveDate, DayDemand> = BTreeMap::new();

    for assignment in assignments {
        let Some(task) = tasks.get(&assignment.task_id) else {
            continue;
        };
        if !task.consumes_resources() {
            continue;
        }
        let Some((start, finish)) = task.window() else {
            continue;
        };

        let hours = assignment.daily_hours(hours_per_day);
        for date in work_dates(start, finish, calendar) {
            let day = demand.entry(date).or_default();
            day.hours += hours;
            if !day.task_ids.iter().any(|id| *id == task.id) {
                day.task_ids.push(task.id.clone());
            }
        }
    }

    demand
}

/// Daily usage of one resource, ascending by date.
///
/// Only dates with demand appear. Capacity is the same on every date.
pub fn build_resource_timeline(
    resource: &Resource,
    assignments: &[TaskResourceAssignment],
    tasks: &TaskArena,
    calendar: &CalendarConfig,
    hours_per_day: f64,
) -> Vec<DailyUsage> {
    let capacity = resource_capacity(resource, hours_per_day);
    let own = assignments.iter().filter(|a| a.resource_id == resource.id);

    accumulate_demand(own, tasks, calendar, hours_per_day)
        .into_iter()
        .map(|(date, day)| DailyUsage {
            date,
            hours: day.hours,
            capacity,
            over_allocated: day.hours > capacity,
        })
        .collect()
}
