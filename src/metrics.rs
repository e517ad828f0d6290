use crate::flatten::Plan;
use crate::model::Progress;

/// Sum of the durations of every step strictly before `index`.
pub fn elapsed_before(plan: &Plan, index: usize) -> u64 {
    plan.steps
        .iter()
        .take(index)
        .map(|s| s.step.duration())
        .fold(0, u64::saturating_add)
}

/// Compute progress for a run positioned at `index`. The in-progress step
/// counts as remaining until it completes.
pub fn compute_progress(plan: &Plan, index: usize) -> Progress {
    let total_secs = plan.total_secs;
    let elapsed_secs = elapsed_before(plan, index);
    let percent = if total_secs == 0 {
        0.0
    } else {
        elapsed_secs as f64 / total_secs as f64 * 100.0
    };
    Progress {
        total_secs,
        elapsed_secs,
        remaining_secs: total_secs.saturating_sub(elapsed_secs),
        percent,
    }
}
