//! Heuristic resource leveling.
//!
//! Conflicts are resolved one working day at a time, always on the earliest
//! over-allocated date, by delaying the least protected contributing task.

mod leveler;
mod ranking;

pub use leveler::{level_resources, ResourceLeveler};
pub use ranking::{compare_for_leveling, rank_contributors};
