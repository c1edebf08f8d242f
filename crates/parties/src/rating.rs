use serde::{Deserialize, Serialize};

use procura_core::{DomainError, DomainResult};

pub const MIN_RATING: f64 = 0.0;
pub const MAX_RATING: f64 = 5.0;

/// Running mean of a vendor's ratings.
///
/// Only [`VendorRatingState::record`] produces a new state; nothing else
/// touches either field.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VendorRatingState {
    pub rating: f64,
    pub total_ratings: u64,
}

impl VendorRatingState {
    /// Fold one more rating into the mean.
    pub fn record(&self, rating: f64) -> DomainResult<Self> {
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(DomainError::validation(format!(
                "rating must be between {MIN_RATING} and {MAX_RATING} (got {rating})"
            )));
        }

        let n = self.total_ratings as f64;
        Ok(Self {
            rating: (n * self.rating + rating) / (n + 1.0),
            total_ratings: self.total_ratings + 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_rating_becomes_the_mean() {
        let state = VendorRatingState::default().record(4.0).unwrap();
        assert_eq!(state, VendorRatingState { rating: 4.0, total_ratings: 1 });
    }

    #[test]
    fn out_of_range_ratings_are_rejected() {
        for r in [-0.1, 5.1, f64::NAN] {
            match VendorRatingState::default().record(r) {
                Err(DomainError::Validation(_)) => {}
                other => panic!("expected validation error for {r}, got {other:?}"),
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: recording r1..rn from (0, 0) yields their arithmetic mean and count n.
        #[test]
        fn running_mean_equals_arithmetic_mean(
            ratings in prop::collection::vec(0.0f64..=5.0, 1..50)
        ) {
            let mut state = VendorRatingState::default();
            for r in &ratings {
                state = state.record(*r).unwrap();
            }

            let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;
            prop_assert_eq!(state.total_ratings, ratings.len() as u64);
            prop_assert!((state.rating - mean).abs() < 1e-9);
        }
    }
}
