//! Airtable filter-formula compilation
//!
//! Produces the single `filterByFormula` string sent with each fetch.
//! Airtable has no dedicated "modified since" list parameter, so the
//! incremental window is expressed as a formula over `CREATED_TIME()` or
//! `LAST_MODIFIED_TIME()`. The user's own formula is passed through
//! verbatim; a malformed one is rejected upstream and fails the run.

use crate::types::TimestampField;
use crate::window::DateWindow;

/// Compile the fetch predicate from the user formula and the resolved window.
///
/// Returns `None` when there is nothing to filter on (fetch all records).
pub fn compile_filter(
    user: Option<&str>,
    window: Option<&DateWindow>,
    timestamp_field: TimestampField,
) -> Option<String> {
    let user = user.map(str::trim).filter(|f| !f.is_empty());
    let window = window.map(|w| window_predicate(w, timestamp_field));

    match (user, window) {
        (None, None) => None,
        (Some(user), None) => Some(user.to_string()),
        (None, Some(window)) => Some(window),
        (Some(user), Some(window)) => Some(format!("AND({user}, {window})")),
    }
}

/// Inclusive-both-ends window predicate over the configured timestamp field.
///
/// `IS_AFTER`/`IS_BEFORE` are strict in Airtable's formula grammar, so
/// inclusivity comes from negating the opposite comparison.
fn window_predicate(window: &DateWindow, timestamp_field: TimestampField) -> String {
    let field = timestamp_field.formula_call();
    let from = window.from.to_rfc3339();
    let to = window.to.to_rfc3339();
    format!("AND(NOT(IS_BEFORE({field}, '{from}')), NOT(IS_AFTER({field}, '{to}')))")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn window() -> DateWindow {
        DateWindow {
            from: DateTime::parse_from_rfc3339("2024-06-10T08:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            to: DateTime::parse_from_rfc3339("2024-06-15T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn test_no_filter_no_window() {
        assert_eq!(
            compile_filter(None, None, TimestampField::LastModifiedTime),
            None
        );
        // Blank user formulas count as absent.
        assert_eq!(
            compile_filter(Some("  "), None, TimestampField::LastModifiedTime),
            None
        );
    }

    #[test]
    fn test_user_filter_passes_through_unmodified() {
        let compiled = compile_filter(
            Some("{Status} = 'shipped'"),
            None,
            TimestampField::LastModifiedTime,
        );
        assert_eq!(compiled.unwrap(), "{Status} = 'shipped'");
    }

    #[test]
    fn test_window_only() {
        let compiled =
            compile_filter(None, Some(&window()), TimestampField::LastModifiedTime).unwrap();
        assert_eq!(
            compiled,
            "AND(NOT(IS_BEFORE(LAST_MODIFIED_TIME(), '2024-06-10T08:00:00+00:00')), \
             NOT(IS_AFTER(LAST_MODIFIED_TIME(), '2024-06-15T12:00:00+00:00')))"
        );
    }

    #[test]
    fn test_window_respects_timestamp_field() {
        let compiled =
            compile_filter(None, Some(&window()), TimestampField::CreatedTime).unwrap();
        assert!(compiled.contains("CREATED_TIME()"));
        assert!(!compiled.contains("LAST_MODIFIED_TIME()"));
    }

    #[test]
    fn test_user_filter_and_window_combined_with_and() {
        let compiled = compile_filter(
            Some("{Status} = 'shipped'"),
            Some(&window()),
            TimestampField::LastModifiedTime,
        )
        .unwrap();
        assert!(compiled.starts_with("AND({Status} = 'shipped', AND(NOT(IS_BEFORE"));
        assert!(compiled.ends_with(")))"));
    }
}
