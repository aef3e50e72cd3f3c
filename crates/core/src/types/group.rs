//! Group kinds.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The kind of a group a member can belong to.
///
/// Stored as lowercase text in the `groups.kind` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    /// A household that orders together and shares a financial account.
    Ordergroup,
    /// A team of volunteers that takes care of recurring tasks.
    Workgroup,
}

impl GroupKind {
    /// Returns the database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ordergroup => "ordergroup",
            Self::Workgroup => "workgroup",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ordergroup => "Ordergroup",
            Self::Workgroup => "Workgroup",
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known [`GroupKind`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown group kind: {0}")]
pub struct UnknownGroupKind(pub String);

impl FromStr for GroupKind {
    type Err = UnknownGroupKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ordergroup" => Ok(Self::Ordergroup),
            "workgroup" => Ok(Self::Workgroup),
            other => Err(UnknownGroupKind(other.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_through_str() {
        for kind in [GroupKind::Ordergroup, GroupKind::Workgroup] {
            assert_eq!(kind.as_str().parse::<GroupKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_rejects_unknown() {
        let err = "committee".parse::<GroupKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown group kind: committee");
    }
}
