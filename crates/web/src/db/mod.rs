//! Persistence for the dashboard.
//!
//! # Database: `foodcoop`
//!
//! ## Tables
//!
//! - `users` - Members and their password hashes
//! - `groups` - Ordergroups and workgroups
//! - `memberships` - Which user belongs to which group
//! - `financial_transactions` - Bookings on ordergroup accounts
//! - `tasks` / `assignments` - Volunteer jobs and who took them
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Backends
//!
//! Handlers only see the [`Store`] trait. [`PgStore`] is used in production;
//! [`MemoryStore`] backs tests and local demos.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/web/migrations/` and run via:
//! ```bash
//! cargo run -p foodcoop-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use foodcoop_core::{GroupId, GroupKind, MembershipId, TaskId, TransactionSort, UserId};

use crate::models::financial_transaction::NewFinancialTransaction;
use crate::models::task::NewTask;
use crate::models::{
    Assignment, FinancialTransaction, Group, Membership, MembershipWithGroup, NewUser,
    ProfileUpdate, Task, TaskWithAssignments, User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Member accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Get a user by ID.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Get a user by email, ignoring case.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Get a user and their password hash by email, ignoring case.
    async fn get_password_hash(&self, email: &str)
    -> Result<Option<(User, String)>, StoreError>;

    /// Create a user.
    ///
    /// Returns `StoreError::Conflict` if the email is taken.
    async fn create_user(&self, new: &NewUser) -> Result<User, StoreError>;

    /// Persist a profile update, including the ordergroup contact address,
    /// atomically.
    ///
    /// Returns `StoreError::Conflict` if the new email is taken and
    /// `StoreError::NotFound` if the user no longer exists.
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, StoreError>;
}

/// Groups and memberships.
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Create a group.
    ///
    /// Returns `StoreError::Conflict` if the name is taken.
    async fn create_group(
        &self,
        name: &str,
        kind: GroupKind,
        contact_address: Option<&str>,
    ) -> Result<Group, StoreError>;

    /// Get a group by ID.
    async fn get_group(&self, id: GroupId) -> Result<Option<Group>, StoreError>;

    /// Add a user to a group.
    ///
    /// Returns `StoreError::Conflict` if the user already is a member, or
    /// already belongs to another ordergroup.
    async fn add_membership(
        &self,
        user_id: UserId,
        group_id: GroupId,
    ) -> Result<Membership, StoreError>;

    /// All memberships of a user, ordered by group name.
    async fn memberships_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<MembershipWithGroup>, StoreError>;

    /// The ordergroup a user belongs to, if any.
    async fn ordergroup_for_user(&self, user_id: UserId) -> Result<Option<Group>, StoreError>;

    /// The user's membership in `group_id`, if any.
    async fn find_membership_by_group(
        &self,
        user_id: UserId,
        group_id: GroupId,
    ) -> Result<Option<MembershipWithGroup>, StoreError>;

    /// The user's membership with ID `membership_id`, if it is theirs.
    async fn find_membership(
        &self,
        user_id: UserId,
        membership_id: MembershipId,
    ) -> Result<Option<MembershipWithGroup>, StoreError>;

    /// Delete a membership. Returns `false` if it did not exist.
    async fn delete_membership(&self, id: MembershipId) -> Result<bool, StoreError>;

    /// Members of a group, ordered by name.
    async fn group_members(&self, group_id: GroupId) -> Result<Vec<User>, StoreError>;
}

/// Ordergroup accounts.
#[async_trait]
pub trait FinancialTransactionStore: Send + Sync {
    /// Book a transaction.
    async fn create_transaction(
        &self,
        new: &NewFinancialTransaction,
    ) -> Result<FinancialTransaction, StoreError>;

    /// An ordergroup's transactions in the requested order.
    async fn transactions_for_ordergroup(
        &self,
        ordergroup_id: GroupId,
        sort: TransactionSort,
    ) -> Result<Vec<FinancialTransaction>, StoreError>;

    /// Sum of all amounts booked on an ordergroup.
    async fn account_balance(&self, ordergroup_id: GroupId) -> Result<Decimal, StoreError>;
}

/// Volunteer tasks.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Create a task.
    async fn create_task(&self, new: &NewTask) -> Result<Task, StoreError>;

    /// Assign a user to a task, or update the acceptance of an existing
    /// assignment.
    async fn assign(
        &self,
        task_id: TaskId,
        user_id: UserId,
        accepted: bool,
    ) -> Result<Assignment, StoreError>;

    /// Mark a task as done.
    async fn complete_task(&self, task_id: TaskId) -> Result<(), StoreError>;

    /// Every task that is not done yet, by due date (undated last).
    async fn open_tasks(&self) -> Result<Vec<TaskWithAssignments>, StoreError>;
}

/// Everything the dashboard persists.
#[async_trait]
pub trait Store: UserStore + GroupStore + FinancialTransactionStore + TaskStore {
    /// Verify the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}
