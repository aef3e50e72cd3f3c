//! Custom Askama template filters.

use std::fmt::Display;

/// Formats a money amount with two decimal places.
///
/// Usage in templates: `{{ balance|money }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn money(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format!("{value:.2}"))
}
