//! `PostgreSQL` implementation of [`Store`].
//!
//! Queries are checked at runtime (`query_as` + `FromRow`) so the crate
//! builds without a live database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use foodcoop_core::{
    Email, FinancialTransactionId, GroupId, GroupKind, MembershipId, TaskId, TransactionSort,
    UserId,
};

use super::{
    FinancialTransactionStore, GroupStore, Store, StoreError, TaskStore, UserStore,
};
use crate::models::financial_transaction::NewFinancialTransaction;
use crate::models::task::NewTask;
use crate::models::{
    Assignment, FinancialTransaction, Group, Membership, MembershipWithGroup, NewUser,
    ProfileUpdate, Task, TaskWithAssignments, User,
};

// =============================================================================
// Internal Row Types
// =============================================================================

const USER_COLUMNS: &str = "id, first_name, last_name, email, phone, created_at";
const GROUP_COLUMNS: &str = "id, name, kind, contact_address, description, created_at";
const MEMBERSHIP_WITH_GROUP: &str = r"
    SELECT m.id AS membership_id, m.user_id, m.group_id,
           g.name, g.kind, g.contact_address, g.description, g.created_at
    FROM memberships m
    JOIN groups g ON g.id = m.group_id
";
const TRANSACTION_COLUMNS: &str = "id, ordergroup_id, user_id, note, amount, created_on";
const TASK_COLUMNS: &str = "id, name, description, due_date, done, required_users, workgroup_id";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            StoreError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            first_name: row.first_name,
            last_name: row.last_name,
            email,
            phone: row.phone,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserWithPasswordRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[derive(Debug, sqlx::FromRow)]
struct GroupRow {
    id: i32,
    name: String,
    kind: String,
    contact_address: Option<String>,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<GroupRow> for Group {
    type Error = StoreError;

    fn try_from(row: GroupRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse::<GroupKind>()
            .map_err(|e| StoreError::DataCorruption(e.to_string()))?;

        Ok(Self {
            id: GroupId::new(row.id),
            name: row.name,
            kind,
            contact_address: row.contact_address,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MembershipWithGroupRow {
    membership_id: i32,
    user_id: i32,
    group_id: i32,
    name: String,
    kind: String,
    contact_address: Option<String>,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MembershipWithGroupRow> for MembershipWithGroup {
    type Error = StoreError;

    fn try_from(row: MembershipWithGroupRow) -> Result<Self, Self::Error> {
        let group = Group::try_from(GroupRow {
            id: row.group_id,
            name: row.name,
            kind: row.kind,
            contact_address: row.contact_address,
            description: row.description,
            created_at: row.created_at,
        })?;

        Ok(Self {
            membership: Membership {
                id: MembershipId::new(row.membership_id),
                user_id: UserId::new(row.user_id),
                group_id: group.id,
            },
            group,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: i32,
    ordergroup_id: i32,
    user_id: i32,
    note: String,
    amount: Decimal,
    created_on: DateTime<Utc>,
}

impl From<TransactionRow> for FinancialTransaction {
    fn from(row: TransactionRow) -> Self {
        Self {
            id: FinancialTransactionId::new(row.id),
            ordergroup_id: GroupId::new(row.ordergroup_id),
            user_id: UserId::new(row.user_id),
            note: row.note,
            amount: row.amount,
            created_on: row.created_on,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: i32,
    name: String,
    description: Option<String>,
    due_date: Option<NaiveDate>,
    done: bool,
    required_users: i32,
    workgroup_id: Option<i32>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Self {
            id: TaskId::new(row.id),
            name: row.name,
            description: row.description,
            due_date: row.due_date,
            done: row.done,
            required_users: row.required_users,
            workgroup_id: row.workgroup_id.map(GroupId::new),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AssignmentRow {
    task_id: i32,
    user_id: i32,
    accepted: bool,
}

impl From<AssignmentRow> for Assignment {
    fn from(row: AssignmentRow) -> Self {
        Self {
            task_id: TaskId::new(row.task_id),
            user_id: UserId::new(row.user_id),
            accepted: row.accepted,
        }
    }
}

/// Map unique violations to `StoreError::Conflict`.
fn conflict_on_unique(e: sqlx::Error, what: &str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return StoreError::Conflict(format!("{what} already exists"));
    }
    StoreError::Database(e)
}

// =============================================================================
// Store
// =============================================================================

/// [`Store`] backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_password_hash(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, StoreError> {
        let row = sqlx::query_as::<_, UserWithPasswordRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some((row.user.try_into()?, row.password_hash)))
    }

    async fn create_user(&self, new: &NewUser) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            INSERT INTO users (first_name, last_name, email, phone, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(new.email.as_str())
        .bind(new.phone.as_deref())
        .bind(&new.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))?;

        row.try_into()
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            UPDATE users
            SET first_name = $1,
                last_name = $2,
                email = $3,
                phone = $4,
                password_hash = COALESCE($5, password_hash)
            WHERE id = $6
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(update.email.as_str())
        .bind(update.phone.as_deref())
        .bind(update.password_hash.as_deref())
        .bind(update.user_id.as_i32())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))?
        .ok_or(StoreError::NotFound)?;

        if let Some((group_id, contact_address)) = &update.ordergroup_contact {
            let result = sqlx::query(
                r"
                UPDATE groups
                SET contact_address = $1
                WHERE id = $2 AND kind = 'ordergroup'
                ",
            )
            .bind(contact_address.as_deref())
            .bind(group_id.as_i32())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound);
            }
        }

        tx.commit().await?;

        row.try_into()
    }
}

#[async_trait]
impl GroupStore for PgStore {
    async fn create_group(
        &self,
        name: &str,
        kind: GroupKind,
        contact_address: Option<&str>,
    ) -> Result<Group, StoreError> {
        let row = sqlx::query_as::<_, GroupRow>(&format!(
            r"
            INSERT INTO groups (name, kind, contact_address)
            VALUES ($1, $2, $3)
            RETURNING {GROUP_COLUMNS}
            "
        ))
        .bind(name)
        .bind(kind.as_str())
        .bind(contact_address)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "group name"))?;

        row.try_into()
    }

    async fn get_group(&self, id: GroupId) -> Result<Option<Group>, StoreError> {
        let row = sqlx::query_as::<_, GroupRow>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn add_membership(
        &self,
        user_id: UserId,
        group_id: GroupId,
    ) -> Result<Membership, StoreError> {
        let mut tx = self.pool.begin().await?;

        let kind: Option<String> = sqlx::query_scalar("SELECT kind FROM groups WHERE id = $1")
            .bind(group_id.as_i32())
            .fetch_optional(&mut *tx)
            .await?;
        let kind = kind
            .ok_or(StoreError::NotFound)?
            .parse::<GroupKind>()
            .map_err(|e| StoreError::DataCorruption(e.to_string()))?;

        if kind == GroupKind::Ordergroup {
            let (has_ordergroup,): (bool,) = sqlx::query_as(
                r"
                SELECT EXISTS (
                    SELECT 1 FROM memberships m
                    JOIN groups g ON g.id = m.group_id
                    WHERE m.user_id = $1 AND g.kind = 'ordergroup'
                )
                ",
            )
            .bind(user_id.as_i32())
            .fetch_one(&mut *tx)
            .await?;

            if has_ordergroup {
                return Err(StoreError::Conflict(
                    "user already belongs to an ordergroup".to_owned(),
                ));
            }
        }

        let (id,): (i32,) = sqlx::query_as(
            r"
            INSERT INTO memberships (user_id, group_id)
            VALUES ($1, $2)
            RETURNING id
            ",
        )
        .bind(user_id.as_i32())
        .bind(group_id.as_i32())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "membership"))?;

        tx.commit().await?;

        Ok(Membership {
            id: MembershipId::new(id),
            user_id,
            group_id,
        })
    }

    async fn memberships_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<MembershipWithGroup>, StoreError> {
        let rows = sqlx::query_as::<_, MembershipWithGroupRow>(&format!(
            "{MEMBERSHIP_WITH_GROUP} WHERE m.user_id = $1 ORDER BY g.name ASC"
        ))
        .bind(user_id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn ordergroup_for_user(&self, user_id: UserId) -> Result<Option<Group>, StoreError> {
        let row = sqlx::query_as::<_, GroupRow>(
            r"
            SELECT g.id, g.name, g.kind, g.contact_address, g.description, g.created_at
            FROM groups g
            JOIN memberships m ON m.group_id = g.id
            WHERE m.user_id = $1 AND g.kind = 'ordergroup'
            LIMIT 1
            ",
        )
        .bind(user_id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_membership_by_group(
        &self,
        user_id: UserId,
        group_id: GroupId,
    ) -> Result<Option<MembershipWithGroup>, StoreError> {
        let row = sqlx::query_as::<_, MembershipWithGroupRow>(&format!(
            "{MEMBERSHIP_WITH_GROUP} WHERE m.user_id = $1 AND m.group_id = $2"
        ))
        .bind(user_id.as_i32())
        .bind(group_id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_membership(
        &self,
        user_id: UserId,
        membership_id: MembershipId,
    ) -> Result<Option<MembershipWithGroup>, StoreError> {
        let row = sqlx::query_as::<_, MembershipWithGroupRow>(&format!(
            "{MEMBERSHIP_WITH_GROUP} WHERE m.user_id = $1 AND m.id = $2"
        ))
        .bind(user_id.as_i32())
        .bind(membership_id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn delete_membership(&self, id: MembershipId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM memberships WHERE id = $1")
            .bind(id.as_i32())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn group_members(&self, group_id: GroupId) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT u.id, u.first_name, u.last_name, u.email, u.phone, u.created_at
            FROM users u
            JOIN memberships m ON m.user_id = u.id
            WHERE m.group_id = $1
            ORDER BY u.first_name ASC, u.last_name ASC, u.id ASC
            ",
        )
        .bind(group_id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[async_trait]
impl FinancialTransactionStore for PgStore {
    async fn create_transaction(
        &self,
        new: &NewFinancialTransaction,
    ) -> Result<FinancialTransaction, StoreError> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r"
            INSERT INTO financial_transactions (ordergroup_id, user_id, note, amount, created_on)
            VALUES ($1, $2, $3, $4, COALESCE($5, NOW()))
            RETURNING {TRANSACTION_COLUMNS}
            "
        ))
        .bind(new.ordergroup_id.as_i32())
        .bind(new.user_id.as_i32())
        .bind(&new.note)
        .bind(new.amount)
        .bind(new.created_on)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn transactions_for_ordergroup(
        &self,
        ordergroup_id: GroupId,
        sort: TransactionSort,
    ) -> Result<Vec<FinancialTransaction>, StoreError> {
        // `order_by` only ever yields one of six static clauses.
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM financial_transactions WHERE ordergroup_id = $1 ORDER BY {}",
            sort.order_by()
        ))
        .bind(ordergroup_id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn account_balance(&self, ordergroup_id: GroupId) -> Result<Decimal, StoreError> {
        let balance: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM financial_transactions WHERE ordergroup_id = $1",
        )
        .bind(ordergroup_id.as_i32())
        .fetch_one(&self.pool)
        .await?;

        Ok(balance)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn create_task(&self, new: &NewTask) -> Result<Task, StoreError> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r"
            INSERT INTO tasks (name, description, due_date, required_users, workgroup_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TASK_COLUMNS}
            "
        ))
        .bind(&new.name)
        .bind(new.description.as_deref())
        .bind(new.due_date)
        .bind(new.required_users)
        .bind(new.workgroup_id.map(|id| id.as_i32()))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn assign(
        &self,
        task_id: TaskId,
        user_id: UserId,
        accepted: bool,
    ) -> Result<Assignment, StoreError> {
        let row = sqlx::query_as::<_, AssignmentRow>(
            r"
            INSERT INTO assignments (task_id, user_id, accepted)
            VALUES ($1, $2, $3)
            ON CONFLICT (task_id, user_id) DO UPDATE SET accepted = EXCLUDED.accepted
            RETURNING task_id, user_id, accepted
            ",
        )
        .bind(task_id.as_i32())
        .bind(user_id.as_i32())
        .bind(accepted)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn complete_task(&self, task_id: TaskId) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE tasks SET done = TRUE WHERE id = $1")
            .bind(task_id.as_i32())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn open_tasks(&self) -> Result<Vec<TaskWithAssignments>, StoreError> {
        let tasks = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE NOT done ORDER BY due_date ASC NULLS LAST, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i32> = tasks.iter().map(|t| t.id).collect();
        let assignments = sqlx::query_as::<_, AssignmentRow>(
            r"
            SELECT task_id, user_id, accepted
            FROM assignments
            WHERE task_id = ANY($1)
            ORDER BY id ASC
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_task: HashMap<i32, Vec<Assignment>> = HashMap::new();
        for row in assignments {
            by_task.entry(row.task_id).or_default().push(row.into());
        }

        Ok(tasks
            .into_iter()
            .map(|row| {
                let assignments = by_task.remove(&row.id).unwrap_or_default();
                TaskWithAssignments {
                    task: row.into(),
                    assignments,
                }
            })
            .collect())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
