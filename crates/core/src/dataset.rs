//! Dataset change gate.
//!
//! Invoked after every training photo add or remove to decide what the
//! mutation means for the user's existing model. The decision is keyed
//! solely on the model's current status, not on a mutation counter, so N
//! rapid successive mutations coalesce into one effective invalidation by
//! construction.

use crate::status::TrainingStatus;

/// Effect of a dataset mutation on the user's model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetChangeEffect {
    /// No trained model is affected by this change.
    None,
    /// The photo set is below the training minimum; nothing to invalidate.
    Insufficient,
    /// A ready model exists and its training set changed: move it to stale.
    Invalidate,
    /// An invalidation was already applied since the last successful
    /// training; do not re-invalidate.
    AlreadyStale,
}

impl DatasetChangeEffect {
    /// Wire name for API responses.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Insufficient => "insufficient",
            Self::Invalidate => "invalidate",
            Self::AlreadyStale => "already_stale",
        }
    }
}

/// Decide the effect of a photo add/remove.
///
/// * `photo_count` - the user's photo count after the mutation.
/// * `min_photos`  - configured training minimum.
/// * `status`      - current training job status, `None` when no row exists.
pub fn evaluate(
    photo_count: i64,
    min_photos: i64,
    status: Option<TrainingStatus>,
) -> DatasetChangeEffect {
    match status {
        Some(TrainingStatus::Ready) => DatasetChangeEffect::Invalidate,
        Some(TrainingStatus::Stale) => DatasetChangeEffect::AlreadyStale,
        // No model, a run still in flight, or a failed/canceled run:
        // nothing ready exists to invalidate.
        _ => {
            if photo_count < min_photos {
                DatasetChangeEffect::Insufficient
            } else {
                DatasetChangeEffect::None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: i64 = 5;

    #[test]
    fn ready_model_is_invalidated() {
        assert_eq!(
            evaluate(7, MIN, Some(TrainingStatus::Ready)),
            DatasetChangeEffect::Invalidate
        );
        // Even when the mutation drops the set below the minimum -- the
        // ready model's training set changed either way.
        assert_eq!(
            evaluate(2, MIN, Some(TrainingStatus::Ready)),
            DatasetChangeEffect::Invalidate
        );
    }

    #[test]
    fn stale_model_is_not_reinvalidated() {
        assert_eq!(
            evaluate(6, MIN, Some(TrainingStatus::Stale)),
            DatasetChangeEffect::AlreadyStale
        );
    }

    #[test]
    fn repeated_mutations_coalesce_by_status() {
        // First delete while ready: invalidate. The status is now stale,
        // so every following delete resolves to AlreadyStale without any
        // debouncing machinery.
        assert_eq!(
            evaluate(6, MIN, Some(TrainingStatus::Ready)),
            DatasetChangeEffect::Invalidate
        );
        for count in (0..6).rev() {
            assert_eq!(
                evaluate(count, MIN, Some(TrainingStatus::Stale)),
                DatasetChangeEffect::AlreadyStale
            );
        }
    }

    #[test]
    fn no_model_below_minimum_is_insufficient() {
        assert_eq!(evaluate(3, MIN, None), DatasetChangeEffect::Insufficient);
        assert_eq!(
            evaluate(4, MIN, Some(TrainingStatus::Failed)),
            DatasetChangeEffect::Insufficient
        );
    }

    #[test]
    fn no_model_at_or_above_minimum_is_none() {
        assert_eq!(evaluate(5, MIN, None), DatasetChangeEffect::None);
        assert_eq!(
            evaluate(9, MIN, Some(TrainingStatus::Canceled)),
            DatasetChangeEffect::None
        );
    }

    #[test]
    fn in_flight_training_is_untouched() {
        assert_eq!(
            evaluate(8, MIN, Some(TrainingStatus::Training)),
            DatasetChangeEffect::None
        );
    }
}
