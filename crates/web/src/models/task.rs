//! Volunteer task domain types.

use chrono::NaiveDate;

use foodcoop_core::{GroupId, TaskId, UserId};

/// A job that needs volunteers, e.g. "Sort the delivery".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub done: bool,
    /// How many people the task needs.
    pub required_users: i32,
    pub workgroup_id: Option<GroupId>,
}

/// A user signed up for (or assigned to) a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub task_id: TaskId,
    pub user_id: UserId,
    pub accepted: bool,
}

/// A task together with everyone assigned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskWithAssignments {
    pub task: Task,
    pub assignments: Vec<Assignment>,
}

impl TaskWithAssignments {
    /// The assignment of `user`, if any.
    #[must_use]
    pub fn assignment_for(&self, user: UserId) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.user_id == user)
    }

    /// Number of people still missing. Never negative.
    #[must_use]
    pub fn still_required(&self) -> i32 {
        let accepted = self.assignments.iter().filter(|a| a.accepted).count();
        let accepted = i32::try_from(accepted).unwrap_or(i32::MAX);
        (self.task.required_users - accepted).max(0)
    }

    /// Due date formatted for display, or a dash.
    #[must_use]
    pub fn due_display(&self) -> String {
        self.task
            .due_date
            .map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d").to_string())
    }
}

/// Data needed to create a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub name: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub required_users: i32,
    pub workgroup_id: Option<GroupId>,
}
