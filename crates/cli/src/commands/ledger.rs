//! Booking on ordergroup accounts.
//!
//! # Usage
//!
//! ```bash
//! # Credit a bank transfer of 50.00 to ordergroup 1, booked by user 2
//! foodcoop-cli transaction add -o 1 -u 2 -a 50.00 -n "Transfer FS1.2"
//! ```

use std::str::FromStr;

use rust_decimal::Decimal;

use foodcoop_core::{GroupId, UserId};
use foodcoop_web::db::{FinancialTransactionStore, GroupStore, UserStore};
use foodcoop_web::models::FinancialTransaction;
use foodcoop_web::models::financial_transaction::NewFinancialTransaction;

use super::{CommandError, store};

/// Book an amount on an ordergroup account. Negative amounts are charges.
///
/// # Errors
///
/// Returns `CommandError` if the amount is malformed or the ordergroup or
/// user does not exist.
pub async fn add_transaction(
    ordergroup: i32,
    user: i32,
    amount: &str,
    note: &str,
) -> Result<FinancialTransaction, CommandError> {
    let amount = Decimal::from_str(amount.trim())
        .map_err(|e| CommandError::InvalidArgument(format!("amount {amount}: {e}")))?
        .round_dp(2);

    let store = store().await?;

    let group = store
        .get_group(GroupId::new(ordergroup))
        .await?
        .filter(|g| g.is_ordergroup())
        .ok_or_else(|| CommandError::NotFound(format!("ordergroup {ordergroup}")))?;
    let user = store
        .get_user(UserId::new(user))
        .await?
        .ok_or_else(|| CommandError::NotFound(format!("user {user}")))?;

    let transaction = store
        .create_transaction(&NewFinancialTransaction {
            ordergroup_id: group.id,
            user_id: user.id,
            note: note.trim().to_owned(),
            amount,
            created_on: None,
        })
        .await?;

    let balance = store.account_balance(group.id).await?;
    tracing::info!(
        transaction_id = %transaction.id,
        group = %group.name,
        %amount,
        %balance,
        "Transaction booked"
    );
    Ok(transaction)
}
