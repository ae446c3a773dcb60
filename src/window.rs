//! Date-window resolution for incremental sync
//!
//! Turns the `date_from`/`date_to` expressions of a configuration row into a
//! concrete `[from, to]` pair. Everything resolves against a single
//! `run_started_at` instant captured once at run start, so the window never
//! moves while pages are being fetched.
//!
//! Accepted expressions:
//! - `"last run"`: the persisted last-run timestamp (epoch when none exists)
//! - `"now"` / `"today"` / `"yesterday"`
//! - relative offsets: `"5 days ago"`, `"2 weeks ago"`, `"1 hour ago"`, ...
//! - absolute: RFC 3339 (`2024-01-15T10:30:00Z`) or `2024-01-15`

use crate::config::SyncOptions;
use crate::error::{Error, Result};
use crate::types::SyncMode;
use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// A resolved, inclusive fetch window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    /// Inclusive window start
    pub from: DateTime<Utc>,
    /// Inclusive window end
    pub to: DateTime<Utc>,
}

/// Lower bound used when `date_from = "last run"` and no prior run exists:
/// the Unix epoch, i.e. a full historical fetch.
pub const DEFAULT_LOWER_BOUND: DateTime<Utc> = DateTime::UNIX_EPOCH;

static RELATIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d+)\s+(minute|hour|day|week|month|year)s?\s+ago$")
        .expect("valid relative-date regex")
});

/// Resolve the fetch window for one run.
///
/// Returns `None` (no date filter) for `full_sync`. For `incremental_sync`
/// both expressions are resolved once against `run_started_at`, and a window
/// whose start is after its end is a configuration error.
pub fn resolve_window(
    sync: &SyncOptions,
    last_run: Option<DateTime<Utc>>,
    run_started_at: DateTime<Utc>,
) -> Result<Option<DateWindow>> {
    if sync.sync_mode == SyncMode::FullSync {
        return Ok(None);
    }

    let from = resolve_expr("date_from", &sync.date_from, last_run, run_started_at)?;
    let to = resolve_expr("date_to", &sync.date_to, last_run, run_started_at)?;

    if from > to {
        return Err(Error::WindowOrder {
            from: from.to_rfc3339(),
            to: to.to_rfc3339(),
        });
    }

    Ok(Some(DateWindow { from, to }))
}

/// Resolve a single date expression against the run-start instant.
fn resolve_expr(
    field: &str,
    expr: &str,
    last_run: Option<DateTime<Utc>>,
    run_started_at: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    let expr = expr.trim();

    match expr.to_ascii_lowercase().as_str() {
        "last run" => return Ok(last_run.unwrap_or(DEFAULT_LOWER_BOUND)),
        "now" => return Ok(run_started_at),
        "today" => {
            return Ok(run_started_at
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .expect("midnight is valid")
                .and_utc());
        }
        "yesterday" => {
            return Ok((run_started_at - Duration::days(1))
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .expect("midnight is valid")
                .and_utc());
        }
        _ => {}
    }

    if let Some(caps) = RELATIVE_RE.captures(expr) {
        let amount: i64 = caps[1]
            .parse()
            .map_err(|_| Error::invalid_value(field, format!("offset too large: '{expr}'")))?;
        let unit = caps[2].to_ascii_lowercase();
        return relative_offset(field, run_started_at, amount, &unit);
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(expr) {
        return Ok(ts.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(expr, "%Y-%m-%d") {
        return Ok(date
            .and_hms_opt(0, 0, 0)
            .expect("midnight is valid")
            .and_utc());
    }

    Err(Error::invalid_value(
        field,
        format!("unrecognized date expression: '{expr}'"),
    ))
}

/// Subtract a relative offset from the run-start instant
fn relative_offset(
    field: &str,
    base: DateTime<Utc>,
    amount: i64,
    unit: &str,
) -> Result<DateTime<Utc>> {
    let result = match unit {
        "minute" => base.checked_sub_signed(Duration::minutes(amount)),
        "hour" => base.checked_sub_signed(Duration::hours(amount)),
        "day" => base.checked_sub_signed(Duration::days(amount)),
        "week" => base.checked_sub_signed(Duration::weeks(amount)),
        "month" => u32::try_from(amount)
            .ok()
            .and_then(|m| base.checked_sub_months(Months::new(m))),
        "year" => u32::try_from(amount)
            .ok()
            .and_then(|y| y.checked_mul(12))
            .and_then(|m| base.checked_sub_months(Months::new(m))),
        _ => None,
    };

    result.ok_or_else(|| Error::invalid_value(field, format!("offset out of range: {amount} {unit}s ago")))
}
