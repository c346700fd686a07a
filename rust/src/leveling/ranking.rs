//! Ranking of the tasks that share an over-allocated day.
//!
//! Tasks are ordered most-protected first; the last task is the one the
//! leveler delays.

use std::cmp::Ordering;

use crate::arena::{TaskArena, TaskIdx};
use crate::config::{LevelingOptions, LevelingOrder};
use crate::models::Task;

/// Compare f64 values for sorting, treating NaN as equal.
fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Order two contributing tasks, most protected first.
///
/// Critical tasks always precede non-critical ones. With
/// `respect_critical_path`, two critical tasks compare equal; otherwise they
/// fall through to the ordering below. Remaining ties go by descending float or
/// ascending `sort_order`, per `leveling_order`. A missing float counts as zero.
pub fn compare_for_leveling(a: &Task, b: &Task, options: &LevelingOptions) -> Ordering {
    match (a.is_critical, b.is_critical) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (true, true) if options.respect_critical_path => return Ordering::Equal,
        _ => {}
    }

    match options.leveling_order {
        LevelingOrder::Float => cmp_f64(
            b.total_float.unwrap_or(0.0),
            a.total_float.unwrap_or(0.0),
        ),
        LevelingOrder::Priority => a.sort_order.cmp(&b.sort_order),
    }
}

/// Resolve conflict task ids and sort them with [`compare_for_leveling`].
///
/// The sort is stable, so equal tasks keep their assignment order. Ids that are
/// not in the arena are dropped.
pub fn rank_contributors<'a>(
    task_ids: &[String],
    tasks: &'a TaskArena,
    options: &LevelingOptions,
) -> Vec<(TaskIdx, &'a Task)> {
    let mut ranked: Vec<(TaskIdx, &Task)> = task_ids
        .iter()
        .filter_map(|id| {
            let idx = tasks.slot(id)?;
            tasks.at(idx).map(|task| (idx, task))
        })
        .collect();
    ranked.sort_by(|(_, a), (_, b)| compare_for_leveling(a, b, options));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskType;

    fn make_task(id: &str, critical: bool, float: Option<f64>, sort_order: i32) -> Task {
        Task {
            id: id.to_string(),
            parent_id: None,
            task_type: TaskType::Normal,
            original_duration: Some(1),
            early_start: None,
            early_finish: None,
            total_float: float,
            is_critical: critical,
            sort_order,
            calendar_id: None,
        }
    }

    fn options(respect_critical_path: bool, leveling_order: LevelingOrder) -> LevelingOptions {
        LevelingOptions {
            respect_critical_path,
            leveling_order,
            ..Default::default()
        }
    }

    fn ranked_ids(tasks: &TaskArena, ids: &[&str], options: &LevelingOptions) -> Vec<String> {
        let ids: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
        rank_contributors(&ids, tasks, options)
            .into_iter()
            .map(|(_, t)| t.id.clone())
            .collect()
    }

    #[test]
    fn test_priority_order_puts_highest_sort_order_last() {
        let tasks = TaskArena::new(vec![
            make_task("low", false, None, 7),
            make_task("high", false, None, 1),
            make_task("mid", false, None, 4),
        ]);
        let opts = options(true, LevelingOrder::Priority);
        assert_eq!(
            ranked_ids(&tasks, &["low", "high", "mid"], &opts),
            vec!["high", "mid", "low"]
        );
    }

    #[test]
    fn test_float_order_is_descending() {
        let tasks = TaskArena::new(vec![
            make_task("tight", false, Some(1.0), 0),
            make_task("slack", false, Some(10.0), 0),
            make_task("unknown", false, None, 0),
        ]);
        let opts = options(true, LevelingOrder::Float);
        assert_eq!(
            ranked_ids(&tasks, &["tight", "unknown", "slack"], &opts),
            vec!["slack", "tight", "unknown"]
        );
    }

    #[test]
    fn test_critical_tasks_are_protected() {
        let tasks = TaskArena::new(vec![
            make_task("crit", true, Some(0.0), 9),
            make_task("free", false, Some(0.0), 1),
        ]);
        let opts = options(true, LevelingOrder::Priority);
        assert_eq!(
            ranked_ids(&tasks, &["free", "crit"], &opts),
            vec!["crit", "free"]
        );
    }

    #[test]
    fn test_critical_ranked_first_when_not_respected() {
        let tasks = TaskArena::new(vec![
            make_task("crit", true, Some(0.0), 9),
            make_task("free", false, Some(0.0), 1),
        ]);
        let opts = options(false, LevelingOrder::Priority);
        assert_eq!(
            ranked_ids(&tasks, &["free", "crit"], &opts),
            vec!["crit", "free"]
        );
    }

    #[test]
    fn test_critical_pair_ordered_when_not_respected() {
        let tasks = TaskArena::new(vec![
            make_task("a", true, Some(0.0), 3),
            make_task("b", true, Some(0.0), 1),
        ]);
        let opts = options(false, LevelingOrder::Priority);
        assert_eq!(ranked_ids(&tasks, &["a", "b"], &opts), vec!["b", "a"]);

        let opts = options(true, LevelingOrder::Priority);
        assert_eq!(ranked_ids(&tasks, &["a", "b"], &opts), vec!["a", "b"]);
    }

    #[test]
    fn test_equal_tasks_keep_input_order() {
        let tasks = TaskArena::new(vec![
            make_task("a", true, None, 3),
            make_task("b", true, None, 1),
        ]);
        let opts = options(true, LevelingOrder::Priority);
        assert_eq!(ranked_ids(&tasks, &["a", "b"], &opts), vec!["a", "b"]);
    }

    #[test]
    fn test_unknown_ids_are_dropped() {
        let tasks = TaskArena::new(vec![make_task("a", false, None, 0)]);
        let opts = LevelingOptions::default();
        assert_eq!(ranked_ids(&tasks, &["ghost", "a"], &opts), vec!["a"]);
    }
}
