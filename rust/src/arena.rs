//! Flat task storage with id lookups.
//!
//! Tasks live in a `Vec` and are addressed by a `u32` slot; a hash index maps
//! the string ids used by assignments and conflict records to slots. The only
//! write path is [`TaskArena::reschedule`], which the leveler uses to move a task.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use crate::models::Task;

/// Slot of a task inside a [`TaskArena`].
pub type TaskIdx = u32;

#[derive(Debug, Clone, Default)]
pub struct TaskArena {
    tasks: Vec<Task>,
    index: FxHashMap<String, TaskIdx>,
}

impl TaskArena {
    /// Build an arena; a repeated id replaces the earlier task in place.
    pub fn new(tasks: Vec<Task>) -> Self {
        let mut arena = Self {
            tasks: Vec::with_capacity(tasks.len()),
            index: FxHashMap::with_capacity_and_hasher(tasks.len(), Default::default()),
        };
        for task in tasks {
            arena.insert(task);
        }
        arena
    }

    fn insert(&mut self, task: Task) -> TaskIdx {
        if let Some(&idx) = self.index.get(&task.id) {
            self.tasks[idx as usize] = task;
            return idx;
        }
        let idx = self.tasks.len() as TaskIdx;
        self.index.insert(task.id.clone(), idx);
        self.tasks.push(task);
        idx
    }

    #[inline]
    pub fn slot(&self, id: &str) -> Option<TaskIdx> {
        self.index.get(id).copied()
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.slot(id).and_then(|idx| self.at(idx))
    }

    #[inline]
    pub fn at(&self, idx: TaskIdx) -> Option<&Task> {
        self.tasks.get(idx as usize)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn ids(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }

    /// Move a task to a new `[early_start, early_finish)` window.
    ///
    /// Returns `false` when the slot does not exist.
    pub(crate) fn reschedule(
        &mut self,
        idx: TaskIdx,
        early_start: NaiveDate,
        early_finish: NaiveDate,
    ) -> bool {
        match self.tasks.get_mut(idx as usize) {
            Some(task) => {
                task.early_start = Some(early_start);
                task.early_finish = Some(early_finish);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskType;

    fn task(id: &str, sort_order: i32) -> Task {
        Task {
            id: id.to_string(),
            parent_id: None,
            task_type: TaskType::Normal,
            original_duration: Some(1),
            early_start: None,
            early_finish: None,
            total_float: None,
            is_critical: false,
            sort_order,
            calendar_id: None,
        }
    }

    #[test]
    fn test_lookup_by_id_and_slot() {
        let arena = TaskArena::new(vec![task("a", 1), task("b", 2)]);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.slot("b"), Some(1));
        assert_eq!(arena.get("a").map(|t| t.sort_order), Some(1));
        assert_eq!(arena.at(1).map(|t| t.id.as_str()), Some("b"));
        assert!(arena.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_id_replaces_in_place() {
        let arena = TaskArena::new(vec![task("a", 1), task("b", 2), task("a", 9)]);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.slot("a"), Some(0));
        assert_eq!(arena.get("a").map(|t| t.sort_order), Some(9));
    }

    #[test]
    fn test_reschedule() {
        let mut arena = TaskArena::new(vec![task("a", 1)]);
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let finish = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        assert!(arena.reschedule(0, start, finish));
        assert_eq!(arena.get("a").and_then(|t| t.window()), Some((start, finish)));
        assert!(!arena.reschedule(7, start, finish));
    }
}
