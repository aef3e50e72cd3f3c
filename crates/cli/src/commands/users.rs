//! Member and group management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a household that orders together
//! foodcoop-cli ordergroup create -n "Lovelace household" -a "Main St 1"
//!
//! # Create a member and put them into ordergroup 1
//! foodcoop-cli user create -e ada@example.org -f Ada -l Lovelace -p 'secret pass' -o 1
//! ```

use foodcoop_core::{GroupId, GroupKind};
use foodcoop_web::db::{GroupStore, StoreError};
use foodcoop_web::models::{Group, User};
use foodcoop_web::services::AuthService;

use super::{CommandError, store};

/// Create a member account, optionally joining an ordergroup.
///
/// # Errors
///
/// Returns `CommandError` if the account cannot be created or the ordergroup
/// does not exist.
pub async fn create_user(
    email: &str,
    first_name: &str,
    last_name: &str,
    password: &str,
    ordergroup: Option<i32>,
) -> Result<User, CommandError> {
    let store = store().await?;

    let ordergroup = match ordergroup.map(GroupId::new) {
        Some(id) => Some(find_ordergroup(&store, id).await?),
        None => None,
    };

    let user = AuthService::new(&store)
        .register(first_name, last_name, email, password)
        .await?;
    tracing::info!(user_id = %user.id, email = %user.email, "Member created");

    if let Some(group) = ordergroup {
        store.add_membership(user.id, group.id).await?;
        tracing::info!(user_id = %user.id, group = %group.name, "Joined ordergroup");
    }

    Ok(user)
}

/// Create a group.
///
/// # Errors
///
/// Returns `CommandError::InvalidArgument` if the name is taken.
pub async fn create_group(
    name: &str,
    kind: GroupKind,
    contact_address: Option<&str>,
) -> Result<Group, CommandError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CommandError::InvalidArgument("group name is empty".into()));
    }

    let store = store().await?;
    let group = store
        .create_group(name, kind, contact_address)
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => {
                CommandError::InvalidArgument(format!("a group named {name} already exists"))
            }
            other => other.into(),
        })?;

    tracing::info!(group_id = %group.id, kind = %group.kind, "Group created: {}", group.name);
    Ok(group)
}

async fn find_ordergroup(store: &impl GroupStore, id: GroupId) -> Result<Group, CommandError> {
    store
        .get_group(id)
        .await?
        .filter(Group::is_ordergroup)
        .ok_or_else(|| CommandError::NotFound(format!("ordergroup {id}")))
}
