//! Orderings for a financial-transaction history.

use core::cmp::Ordering;
use core::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// The `sort` parameter accepted by the ordergroup page.
///
/// Ties on the sort key are always broken by ascending ID (insertion order),
/// in both directions, so the same request yields the same page every time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransactionSort {
    Date,
    Note,
    Amount,
    /// Newest first. Used when no or an unrecognised value is given.
    #[default]
    DateReverse,
    NoteReverse,
    AmountReverse,
}

/// The fields a transaction is ordered by.
#[derive(Debug, Clone, Copy)]
pub struct SortFields<'a> {
    pub id: i32,
    pub created_on: DateTime<Utc>,
    pub note: &'a str,
    pub amount: Decimal,
}

impl TransactionSort {
    /// All recognised orderings, in the order the page links them.
    pub const ALL: [Self; 6] = [
        Self::Date,
        Self::Note,
        Self::Amount,
        Self::DateReverse,
        Self::NoteReverse,
        Self::AmountReverse,
    ];

    /// Parse a recognised query value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|sort| sort.as_str() == value)
    }

    /// Resolve an optional query value, falling back to the default.
    #[must_use]
    pub fn from_param(value: Option<&str>) -> Self {
        value.and_then(Self::parse).unwrap_or_default()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Note => "note",
            Self::Amount => "amount",
            Self::DateReverse => "date_reverse",
            Self::NoteReverse => "note_reverse",
            Self::AmountReverse => "amount_reverse",
        }
    }

    #[must_use]
    pub const fn is_reverse(self) -> bool {
        matches!(
            self,
            Self::DateReverse | Self::NoteReverse | Self::AmountReverse
        )
    }

    /// The ordering a column header should link to: clicking the active
    /// column flips its direction, any other column starts ascending.
    #[must_use]
    pub const fn toggle_for(self, column: Self) -> Self {
        match (self, column) {
            (Self::Date, Self::Date | Self::DateReverse) => Self::DateReverse,
            (Self::Note, Self::Note | Self::NoteReverse) => Self::NoteReverse,
            (Self::Amount, Self::Amount | Self::AmountReverse) => Self::AmountReverse,
            (_, Self::Date | Self::DateReverse) => Self::Date,
            (_, Self::Note | Self::NoteReverse) => Self::Note,
            (_, Self::Amount | Self::AmountReverse) => Self::Amount,
        }
    }

    /// SQL `ORDER BY` clause for the `financial_transactions` table.
    ///
    /// Notes compare bytewise (`COLLATE "C"`), matching [`Self::compare`].
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::Date => "created_on ASC, id ASC",
            Self::Note => r#"note COLLATE "C" ASC, id ASC"#,
            Self::Amount => "amount ASC, id ASC",
            Self::DateReverse => "created_on DESC, id ASC",
            Self::NoteReverse => r#"note COLLATE "C" DESC, id ASC"#,
            Self::AmountReverse => "amount DESC, id ASC",
        }
    }

    /// Compare two transactions under this ordering.
    #[must_use]
    pub fn compare(self, a: &SortFields<'_>, b: &SortFields<'_>) -> Ordering {
        let primary = match self {
            Self::Date | Self::DateReverse => a.created_on.cmp(&b.created_on),
            Self::Note | Self::NoteReverse => a.note.cmp(b.note),
            Self::Amount | Self::AmountReverse => a.amount.cmp(&b.amount),
        };
        let primary = if self.is_reverse() {
            primary.reverse()
        } else {
            primary
        };
        primary.then(a.id.cmp(&b.id))
    }

    /// Sort a slice in place using `fields` to project each element.
    pub fn sort<T>(self, items: &mut [T], fields: impl Fn(&T) -> SortFields<'_>) {
        items.sort_by(|a, b| self.compare(&fields(a), &fields(b)));
    }
}

impl fmt::Display for TransactionSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
