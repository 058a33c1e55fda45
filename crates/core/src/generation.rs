//! Parent-status aggregation for generation jobs.
//!
//! A generation job fans out to N independent units. The parent's status
//! is always a pure recomputation from the full unit-status multiset --
//! never an incremental patch -- so the webhook and poll paths cannot
//! drift apart no matter which order unit updates arrive in.

use crate::status::GenerationUnitStatus;

/// Aggregated parent status derived from a unit-status multiset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAggregate {
    /// No unit has been picked up yet.
    Queued,
    /// At least one unit is still non-terminal.
    Running,
    /// Every unit succeeded.
    Succeeded,
    /// Every unit is terminal and some (not all) succeeded.
    SucceededPartial { failed_units: usize },
    /// Every unit is terminal and none succeeded.
    Failed,
    /// Every unit was canceled.
    Canceled,
}

/// Compute the parent status from the full unit-status set.
///
/// The result depends only on the multiset of statuses, not on the order
/// units reached them. An empty set aggregates to `Failed`: both "all
/// succeeded" and "none succeeded" hold vacuously, and the tie breaks
/// toward the non-usable outcome (creation validation keeps real jobs at
/// one unit or more).
pub fn aggregate(units: &[GenerationUnitStatus]) -> JobAggregate {
    if units.is_empty() {
        return JobAggregate::Failed;
    }

    if units.iter().all(|s| *s == GenerationUnitStatus::Queued) {
        return JobAggregate::Queued;
    }

    if units.iter().any(|s| !s.is_terminal()) {
        return JobAggregate::Running;
    }

    let succeeded = units
        .iter()
        .filter(|s| **s == GenerationUnitStatus::Succeeded)
        .count();

    if succeeded == units.len() {
        JobAggregate::Succeeded
    } else if succeeded > 0 {
        JobAggregate::SucceededPartial {
            failed_units: units.len() - succeeded,
        }
    } else if units.iter().all(|s| *s == GenerationUnitStatus::Canceled) {
        JobAggregate::Canceled
    } else {
        JobAggregate::Failed
    }
}

/// Progress percentage: share of units that reached a terminal status.
pub fn progress_percent(units: &[GenerationUnitStatus]) -> i16 {
    if units.is_empty() {
        return 0;
    }
    let terminal = units.iter().filter(|s| s.is_terminal()).count();
    ((terminal * 100) / units.len()) as i16
}

/// Human-readable phase for status responses.
pub fn phase(units: &[GenerationUnitStatus]) -> &'static str {
    match aggregate(units) {
        JobAggregate::Queued => "queued",
        JobAggregate::Running => "generating",
        _ => "complete",
    }
}
