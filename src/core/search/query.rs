//! Query validation and normalization.
//!
//! Queries are matched as plain substrings, so there is no syntax to
//! parse. A query is trimmed, checked for length, then folded the
//! same way stored fields are.

use crate::core::error::{Result, SiteIndexError};
use crate::core::text::fold;

/// Validate `raw` and return its folded form.
///
/// `max_length` counts characters, not bytes, so non-Latin queries are
/// not penalized.
///
/// # Examples
///
/// ```
/// use siteindex::core::search::prepare_query;
///
/// assert_eq!(prepare_query("  Budget ", 100).unwrap(), "budget");
/// assert!(prepare_query("   ", 100).is_err());
/// ```
pub fn prepare_query(raw: &str, max_length: usize) -> Result<String> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(SiteIndexError::InvalidQuery(
            "Query cannot be empty".to_string(),
        ));
    }

    let length = trimmed.chars().count();
    if length > max_length {
        return Err(SiteIndexError::InvalidQuery(format!(
            "Query is {length} characters long, the maximum is {max_length}"
        )));
    }

    Ok(fold(trimmed))
}
