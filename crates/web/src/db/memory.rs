//! In-memory implementation of [`Store`].
//!
//! Enforces the same constraints as the SQL schema: unique emails (ignoring
//! case), unique group names and at most one ordergroup per user. Used by the
//! test suites and for running the server without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use foodcoop_core::{
    FinancialTransactionId, GroupId, GroupKind, MembershipId, TaskId, TransactionSort, UserId,
};

use super::{FinancialTransactionStore, GroupStore, Store, StoreError, TaskStore, UserStore};
use crate::models::financial_transaction::NewFinancialTransaction;
use crate::models::task::NewTask;
use crate::models::{
    Assignment, FinancialTransaction, Group, Membership, MembershipWithGroup, NewUser,
    ProfileUpdate, Task, TaskWithAssignments, User,
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<(User, String)>,
    groups: Vec<Group>,
    memberships: Vec<Membership>,
    transactions: Vec<FinancialTransaction>,
    tasks: Vec<Task>,
    assignments: Vec<Assignment>,
    sequences: HashMap<&'static str, i32>,
}

impl Tables {
    fn next_id(&mut self, table: &'static str) -> i32 {
        let next = self.sequences.entry(table).or_insert(0);
        *next += 1;
        *next
    }

    fn user(&self, id: UserId) -> Option<&User> {
        self.users.iter().map(|(u, _)| u).find(|u| u.id == id)
    }

    fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.users
            .iter()
            .any(|(u, _)| u.email.matches(email) && Some(u.id) != except)
    }

    fn with_group(&self, membership: &Membership) -> Result<MembershipWithGroup, StoreError> {
        let group = self.group(membership.group_id).cloned().ok_or_else(|| {
            StoreError::DataCorruption(format!(
                "membership {} points to missing group {}",
                membership.id, membership.group_id
            ))
        })?;
        Ok(MembershipWithGroup {
            membership: *membership,
            group,
        })
    }

    fn find_membership_where(
        &self,
        predicate: impl Fn(&Membership) -> bool,
    ) -> Result<Option<MembershipWithGroup>, StoreError> {
        self.memberships
            .iter()
            .find(|&m| predicate(m))
            .map(|m| self.with_group(m))
            .transpose()
    }
}

/// [`Store`] keeping everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.user(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .map(|(u, _)| u)
            .find(|u| u.email.matches(email))
            .cloned())
    }

    async fn get_password_hash(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|(u, _)| u.email.matches(email))
            .cloned())
    }

    async fn create_user(&self, new: &NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(new.email.as_str(), None) {
            return Err(StoreError::Conflict("email already exists".to_owned()));
        }

        let user = User {
            id: UserId::new(tables.next_id("users")),
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            email: new.email.clone(),
            phone: new.phone.clone(),
            created_at: Utc::now(),
        };
        tables.users.push((user.clone(), new.password_hash.clone()));
        Ok(user)
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;

        if tables.email_taken(update.email.as_str(), Some(update.user_id)) {
            return Err(StoreError::Conflict("email already exists".to_owned()));
        }

        // Validate everything before the first write so a failure leaves
        // both tables untouched.
        let group_index = match &update.ordergroup_contact {
            Some((group_id, _)) => Some(
                tables
                    .groups
                    .iter()
                    .position(|g| g.id == *group_id && g.kind == GroupKind::Ordergroup)
                    .ok_or(StoreError::NotFound)?,
            ),
            None => None,
        };
        let user_index = tables
            .users
            .iter()
            .position(|(u, _)| u.id == update.user_id)
            .ok_or(StoreError::NotFound)?;

        if let (Some(index), Some((_, contact))) = (group_index, &update.ordergroup_contact)
            && let Some(group) = tables.groups.get_mut(index)
        {
            group.contact_address.clone_from(contact);
        }

        let (user, hash) = tables
            .users
            .get_mut(user_index)
            .ok_or(StoreError::NotFound)?;
        user.first_name.clone_from(&update.first_name);
        user.last_name.clone_from(&update.last_name);
        user.email = update.email.clone();
        user.phone.clone_from(&update.phone);
        if let Some(new_hash) = &update.password_hash {
            hash.clone_from(new_hash);
        }

        Ok(user.clone())
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn create_group(
        &self,
        name: &str,
        kind: GroupKind,
        contact_address: Option<&str>,
    ) -> Result<Group, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.groups.iter().any(|g| g.name == name) {
            return Err(StoreError::Conflict("group name already exists".to_owned()));
        }

        let group = Group {
            id: GroupId::new(tables.next_id("groups")),
            name: name.to_owned(),
            kind,
            contact_address: contact_address.map(str::to_owned),
            description: None,
            created_at: Utc::now(),
        };
        tables.groups.push(group.clone());
        Ok(group)
    }

    async fn get_group(&self, id: GroupId) -> Result<Option<Group>, StoreError> {
        Ok(self.tables.read().await.group(id).cloned())
    }

    async fn add_membership(
        &self,
        user_id: UserId,
        group_id: GroupId,
    ) -> Result<Membership, StoreError> {
        let mut tables = self.tables.write().await;
        let kind = tables.group(group_id).ok_or(StoreError::NotFound)?.kind;
        if tables.user(user_id).is_none() {
            return Err(StoreError::NotFound);
        }

        if tables
            .memberships
            .iter()
            .any(|m| m.user_id == user_id && m.group_id == group_id)
        {
            return Err(StoreError::Conflict("membership already exists".to_owned()));
        }

        if kind == GroupKind::Ordergroup {
            let has_ordergroup = tables.memberships.iter().any(|m| {
                m.user_id == user_id
                    && tables
                        .group(m.group_id)
                        .is_some_and(|g| g.kind == GroupKind::Ordergroup)
            });
            if has_ordergroup {
                return Err(StoreError::Conflict(
                    "user already belongs to an ordergroup".to_owned(),
                ));
            }
        }

        let membership = Membership {
            id: MembershipId::new(tables.next_id("memberships")),
            user_id,
            group_id,
        };
        tables.memberships.push(membership);
        Ok(membership)
    }

    async fn memberships_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<MembershipWithGroup>, StoreError> {
        let tables = self.tables.read().await;
        let mut memberships = tables
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .map(|m| tables.with_group(m))
            .collect::<Result<Vec<_>, _>>()?;
        memberships.sort_by(|a, b| a.group.name.cmp(&b.group.name));
        Ok(memberships)
    }

    async fn ordergroup_for_user(&self, user_id: UserId) -> Result<Option<Group>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| tables.group(m.group_id))
            .find(|g| g.kind == GroupKind::Ordergroup)
            .cloned())
    }

    async fn find_membership_by_group(
        &self,
        user_id: UserId,
        group_id: GroupId,
    ) -> Result<Option<MembershipWithGroup>, StoreError> {
        self.tables
            .read()
            .await
            .find_membership_where(|m| m.user_id == user_id && m.group_id == group_id)
    }

    async fn find_membership(
        &self,
        user_id: UserId,
        membership_id: MembershipId,
    ) -> Result<Option<MembershipWithGroup>, StoreError> {
        self.tables
            .read()
            .await
            .find_membership_where(|m| m.user_id == user_id && m.id == membership_id)
    }

    async fn delete_membership(&self, id: MembershipId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.memberships.len();
        tables.memberships.retain(|m| m.id != id);
        Ok(tables.memberships.len() < before)
    }

    async fn group_members(&self, group_id: GroupId) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        let mut members: Vec<User> = tables
            .memberships
            .iter()
            .filter(|m| m.group_id == group_id)
            .filter_map(|m| tables.user(m.user_id).cloned())
            .collect();
        members.sort_by(|a, b| {
            (&a.first_name, &a.last_name, a.id).cmp(&(&b.first_name, &b.last_name, b.id))
        });
        Ok(members)
    }
}

#[async_trait]
impl FinancialTransactionStore for MemoryStore {
    async fn create_transaction(
        &self,
        new: &NewFinancialTransaction,
    ) -> Result<FinancialTransaction, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables
            .group(new.ordergroup_id)
            .is_some_and(Group::is_ordergroup)
        {
            return Err(StoreError::NotFound);
        }

        let transaction = FinancialTransaction {
            id: FinancialTransactionId::new(tables.next_id("financial_transactions")),
            ordergroup_id: new.ordergroup_id,
            user_id: new.user_id,
            note: new.note.clone(),
            amount: new.amount.round_dp(2),
            created_on: new.created_on.unwrap_or_else(Utc::now),
        };
        tables.transactions.push(transaction.clone());
        Ok(transaction)
    }

    async fn transactions_for_ordergroup(
        &self,
        ordergroup_id: GroupId,
        sort: TransactionSort,
    ) -> Result<Vec<FinancialTransaction>, StoreError> {
        let tables = self.tables.read().await;
        let mut transactions: Vec<FinancialTransaction> = tables
            .transactions
            .iter()
            .filter(|t| t.ordergroup_id == ordergroup_id)
            .cloned()
            .collect();
        sort.sort(&mut transactions, FinancialTransaction::sort_fields);
        Ok(transactions)
    }

    async fn account_balance(&self, ordergroup_id: GroupId) -> Result<Decimal, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .transactions
            .iter()
            .filter(|t| t.ordergroup_id == ordergroup_id)
            .map(|t| t.amount)
            .sum())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create_task(&self, new: &NewTask) -> Result<Task, StoreError> {
        let mut tables = self.tables.write().await;
        let task = Task {
            id: TaskId::new(tables.next_id("tasks")),
            name: new.name.clone(),
            description: new.description.clone(),
            due_date: new.due_date,
            done: false,
            required_users: new.required_users,
            workgroup_id: new.workgroup_id,
        };
        tables.tasks.push(task.clone());
        Ok(task)
    }

    async fn assign(
        &self,
        task_id: TaskId,
        user_id: UserId,
        accepted: bool,
    ) -> Result<Assignment, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.tasks.iter().any(|t| t.id == task_id) || tables.user(user_id).is_none() {
            return Err(StoreError::NotFound);
        }

        if let Some(existing) = tables
            .assignments
            .iter_mut()
            .find(|a| a.task_id == task_id && a.user_id == user_id)
        {
            existing.accepted = accepted;
            return Ok(*existing);
        }

        let assignment = Assignment {
            task_id,
            user_id,
            accepted,
        };
        tables.assignments.push(assignment);
        Ok(assignment)
    }

    async fn complete_task(&self, task_id: TaskId) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let task = tables
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or(StoreError::NotFound)?;
        task.done = true;
        Ok(())
    }

    async fn open_tasks(&self) -> Result<Vec<TaskWithAssignments>, StoreError> {
        let tables = self.tables.read().await;
        let mut tasks: Vec<TaskWithAssignments> = tables
            .tasks
            .iter()
            .filter(|t| !t.done)
            .map(|t| TaskWithAssignments {
                task: t.clone(),
                assignments: tables
                    .assignments
                    .iter()
                    .filter(|a| a.task_id == t.id)
                    .copied()
                    .collect(),
            })
            .collect();
        // Undated tasks last, like `NULLS LAST`.
        tasks.sort_by_key(|t| (t.task.due_date.is_none(), t.task.due_date, t.task.id));
        Ok(tasks)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};
    use foodcoop_core::Email;

    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: Email::parse(email).unwrap(),
            phone: None,
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_email_is_unique_ignoring_case() {
        let store = MemoryStore::new();
        store.create_user(&new_user("ada@coop.example")).await.unwrap();
        let err = store
            .create_user(&new_user("ADA@coop.example"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_one_ordergroup_per_user() {
        let store = MemoryStore::new();
        let user = store.create_user(&new_user("ada@coop.example")).await.unwrap();
        let first = store
            .create_group("Household A", GroupKind::Ordergroup, None)
            .await
            .unwrap();
        let second = store
            .create_group("Household B", GroupKind::Ordergroup, None)
            .await
            .unwrap();
        let workgroup = store
            .create_group("Sorting", GroupKind::Workgroup, None)
            .await
            .unwrap();

        store.add_membership(user.id, first.id).await.unwrap();
        store.add_membership(user.id, workgroup.id).await.unwrap();
        let err = store.add_membership(user.id, second.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let og = store.ordergroup_for_user(user.id).await.unwrap().unwrap();
        assert_eq!(og.id, first.id);
    }

    #[tokio::test]
    async fn test_find_membership_only_returns_own() {
        let store = MemoryStore::new();
        let ada = store.create_user(&new_user("ada@coop.example")).await.unwrap();
        let bob = store.create_user(&new_user("bob@coop.example")).await.unwrap();
        let group = store
            .create_group("Sorting", GroupKind::Workgroup, None)
            .await
            .unwrap();
        let membership = store.add_membership(ada.id, group.id).await.unwrap();

        assert!(store
            .find_membership(bob.id, membership.id)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_membership_by_group(bob.id, group.id)
            .await
            .unwrap()
            .is_none());

        let found = store
            .find_membership_by_group(ada.id, group.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.group.name, "Sorting");

        assert!(store.delete_membership(membership.id).await.unwrap());
        assert!(!store.delete_membership(membership.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_profile_update_changes_nothing() {
        let store = MemoryStore::new();
        let ada = store.create_user(&new_user("ada@coop.example")).await.unwrap();
        let workgroup = store
            .create_group("Sorting", GroupKind::Workgroup, Some("Hall 1"))
            .await
            .unwrap();

        let update = ProfileUpdate {
            user_id: ada.id,
            first_name: "Augusta".to_string(),
            last_name: ada.last_name.clone(),
            email: ada.email.clone(),
            phone: None,
            password_hash: None,
            ordergroup_contact: Some((workgroup.id, Some("Elsewhere".to_string()))),
        };
        let err = store.update_profile(&update).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));

        let unchanged = store.get_user(ada.id).await.unwrap().unwrap();
        assert_eq!(unchanged.first_name, "Ada");
        let group = store.get_group(workgroup.id).await.unwrap().unwrap();
        assert_eq!(group.contact_address.as_deref(), Some("Hall 1"));
    }

    #[tokio::test]
    async fn test_transactions_and_balance() {
        let store = MemoryStore::new();
        let ada = store.create_user(&new_user("ada@coop.example")).await.unwrap();
        let og = store
            .create_group("Household A", GroupKind::Ordergroup, None)
            .await
            .unwrap();
        let t0 = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
        for (note, cents, offset) in [("Deposit", 5000, 0), ("Order 12", -1250, 5)] {
            store
                .create_transaction(&NewFinancialTransaction {
                    ordergroup_id: og.id,
                    user_id: ada.id,
                    note: note.to_string(),
                    amount: Decimal::new(cents, 2),
                    created_on: Some(t0 + Duration::minutes(offset)),
                })
                .await
                .unwrap();
        }

        let newest_first = store
            .transactions_for_ordergroup(og.id, TransactionSort::DateReverse)
            .await
            .unwrap();
        assert_eq!(newest_first.first().unwrap().note, "Order 12");
        assert_eq!(
            store.account_balance(og.id).await.unwrap(),
            Decimal::new(3750, 2)
        );
    }

    #[tokio::test]
    async fn test_open_tasks_skip_done_and_put_undated_last() {
        let store = MemoryStore::new();
        let task = |name: &str, due: Option<chrono::NaiveDate>| NewTask {
            name: name.to_string(),
            description: None,
            due_date: due,
            required_users: 1,
            workgroup_id: None,
        };
        let undated = store.create_task(&task("Clean fridge", None)).await.unwrap();
        let soon = store
            .create_task(&task(
                "Sort delivery",
                chrono::NaiveDate::from_ymd_opt(2026, 5, 2),
            ))
            .await
            .unwrap();
        let done = store
            .create_task(&task("Inventory", chrono::NaiveDate::from_ymd_opt(2026, 5, 1)))
            .await
            .unwrap();
        store.complete_task(done.id).await.unwrap();

        let open: Vec<TaskId> = store
            .open_tasks()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.task.id)
            .collect();
        assert_eq!(open, vec![soon.id, undated.id]);
    }
}
