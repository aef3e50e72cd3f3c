//! Task lists shown on the dashboard.

use chrono::{Days, NaiveDate};

use foodcoop_core::UserId;

use crate::models::TaskWithAssignments;

/// How far ahead the dashboard looks for upcoming tasks.
pub const UPCOMING_DAYS: u64 = 7;

/// The three task lists of a member's dashboard.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DashboardTasks {
    /// Assigned to the member, waiting for them to accept.
    pub unaccepted: Vec<TaskWithAssignments>,
    /// Accepted by the member and due soon or overdue.
    pub next: Vec<TaskWithAssignments>,
    /// Due soon, still short of people, and the member is not on it.
    pub unassigned: Vec<TaskWithAssignments>,
}

impl DashboardTasks {
    /// Sort `tasks` into the dashboard lists for `user`.
    ///
    /// Done tasks are skipped. Input order is kept within each list.
    #[must_use]
    pub fn classify(tasks: Vec<TaskWithAssignments>, user: UserId, today: NaiveDate) -> Self {
        let horizon = today
            .checked_add_days(Days::new(UPCOMING_DAYS))
            .unwrap_or(NaiveDate::MAX);
        let mut lists = Self::default();

        for task in tasks.into_iter().filter(|t| !t.task.done) {
            let due = task.task.due_date;
            match task.assignment_for(user).map(|a| a.accepted) {
                Some(false) => lists.unaccepted.push(task),
                Some(true) => {
                    if due.is_some_and(|d| d <= horizon) {
                        lists.next.push(task);
                    }
                }
                None => {
                    if task.still_required() > 0
                        && due.is_some_and(|d| d >= today && d <= horizon)
                    {
                        lists.unassigned.push(task);
                    }
                }
            }
        }

        lists
    }
}
