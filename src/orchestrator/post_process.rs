//! Post-run processing utilities.
//!
//! Stamps a finished or ended run's summary before presentation layers show it.

use crate::model::RunSummary;

/// Stamp the completion time (RFC 3339, UTC) onto a run summary.
pub(crate) fn process_run_completion(summary: &RunSummary) -> RunSummary {
    let mut processed = summary.clone();
    processed.completed_at_utc = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into());
    processed
}
