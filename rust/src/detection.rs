//! Over-allocation detection across all resources.

use rustc_hash::FxHashMap;

use crate::arena::TaskArena;
use crate::calendar::CalendarConfig;
use crate::models::{OverAllocation, Resource, TaskResourceAssignment};
use crate::timeline::{accumulate_demand, resource_capacity};

/// Group assignments by resource id, keeping input order within each group.
fn assignments_by_resource(
    assignments: &[TaskResourceAssignment],
) -> FxHashMap<&str, Vec<&TaskResourceAssignment>> {
    let mut grouped: FxHashMap<&str, Vec<&TaskResourceAssignment>> = FxHashMap::default();
    for assignment in assignments {
        grouped
            .entry(assignment.resource_id.as_str())
            .or_default()
            .push(assignment);
    }
    grouped
}

/// Find every (resource, date) where demand strictly exceeds capacity.
///
/// The result is sorted by date. Conflicts on the same date keep the order of
/// `resources`, so repeated calls on the same snapshot give identical output.
pub fn detect_over_allocations(
    resources: &[Resource],
    assignments: &[TaskResourceAssignment],
    tasks: &TaskArena,
    calendar: &CalendarConfig,
    hours_per_day: f64,
) -> Vec<OverAllocation> {
    let grouped = assignments_by_resource(assignments);
    let mut over_allocations: Vec<OverAllocation> = Vec::new();

    for resource in resources {
        let Some(own) = grouped.get(resource.id.as_str()) else {
            continue;
        };
        let capacity = resource_capacity(resource, hours_per_day);
        let demand = accumulate_demand(own.iter().copied(), tasks, calendar, hours_per_day);

        for (date, day) in demand {
            if day.hours > capacity {
                over_allocations.push(OverAllocation {
                    resource_id: resource.id.clone(),
                    resource_name: resource.name.clone(),
                    date,
                    allocated_hours: day.hours,
                    capacity,
                    excess_hours: day.hours - capacity,
                    conflicting_task_ids: day.task_ids,
                });
            }
        }
    }

    // Stable: same-date conflicts stay in resource order
    over_allocations.sort_by_key(|o| o.date);
    over_allocations
}
