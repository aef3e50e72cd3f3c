//! Financial transaction domain type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use foodcoop_core::{FinancialTransactionId, GroupId, SortFields, UserId};

/// A booking on an ordergroup's account.
///
/// Positive amounts are deposits, negative amounts are charges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinancialTransaction {
    pub id: FinancialTransactionId,
    pub ordergroup_id: GroupId,
    /// Who booked the transaction.
    pub user_id: UserId,
    pub note: String,
    pub amount: Decimal,
    pub created_on: DateTime<Utc>,
}

impl FinancialTransaction {
    /// The fields [`foodcoop_core::TransactionSort`] orders by.
    #[must_use]
    pub fn sort_fields(&self) -> SortFields<'_> {
        SortFields {
            id: self.id.as_i32(),
            created_on: self.created_on,
            note: &self.note,
            amount: self.amount,
        }
    }

    #[must_use]
    pub fn is_charge(&self) -> bool {
        self.amount.is_sign_negative()
    }
}

/// Data needed to book a transaction.
#[derive(Debug, Clone)]
pub struct NewFinancialTransaction {
    pub ordergroup_id: GroupId,
    pub user_id: UserId,
    pub note: String,
    pub amount: Decimal,
    /// Defaults to now when `None`.
    pub created_on: Option<DateTime<Utc>>,
}
