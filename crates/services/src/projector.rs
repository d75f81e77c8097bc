//! Pure derivation of the task board view.
//!
//! No side effects, no caching: recomputed from the current task list and
//! the selected filter on every change of either.

use api_types::{DocumentId, Task, TaskStatus};

/// Assignee filter over the task list. `All` is the no-filter case.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TaskFilter {
    #[default]
    All,
    Assignee(DocumentId),
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Assignee(user_id) => task.assigned_to == *user_id,
        }
    }
}

/// Filtered task list plus aggregate counts, all over the filtered set.
#[derive(Debug, Clone)]
pub struct Projection {
    pub filtered: Vec<Task>,
    pub total: usize,
    pub pending_count: usize,
    pub completed_count: usize,
}

/// Project the task list through the filter. Order-preserving: filtering
/// never reorders, so the store's newest-first ordering survives.
pub fn project(tasks: &[Task], filter: &TaskFilter) -> Projection {
    let filtered: Vec<Task> = tasks
        .iter()
        .filter(|task| filter.matches(task))
        .cloned()
        .collect();
    let pending_count = filtered
        .iter()
        .filter(|t| t.status == TaskStatus::Pending)
        .count();
    let completed_count = filtered
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();
    Projection {
        total: filtered.len(),
        pending_count,
        completed_count,
        filtered,
    }
}
