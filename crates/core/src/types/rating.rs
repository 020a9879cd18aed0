//! Review star ratings.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a rating is outside `1..=5`.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rating must be between {min} and {max}, got {value}", min = Rating::MIN, max = Rating::MAX)]
pub struct RatingError {
    /// The rejected value.
    pub value: i64,
}

/// A star rating from 1 to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
    /// Lowest allowed rating.
    pub const MIN: u8 = 1;
    /// Highest allowed rating.
    pub const MAX: u8 = 5;

    /// Build a rating.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError`] if `value` is outside `1..=5`.
    pub fn new(value: i64) -> Result<Self, RatingError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingError { value })
    }

    /// The rating as a plain number.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

/// Arithmetic mean of a set of ratings, or `None` when there are none.
#[must_use]
pub fn average(ratings: impl IntoIterator<Item = Rating>) -> Option<f64> {
    let (sum, count) = ratings
        .into_iter()
        .fold((0_u64, 0_u32), |(sum, count), r| {
            (sum + u64::from(r.value()), count + 1)
        });
    if count == 0 {
        return None;
    }
    #[allow(clippy::cast_precision_loss)] // sums of u8 ratings stay far below 2^52
    let sum = sum as f64;
    Some(sum / f64::from(count))
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> Self {
        Self::from(rating.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_range() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert!(Rating::new(-1).is_err());
        assert_eq!(Rating::new(5).unwrap().value(), 5);
    }

    #[test]
    fn test_average() {
        let ratings = [4, 5].map(|r| Rating::new(r).unwrap());
        assert!((average(ratings).unwrap() - 4.5).abs() < f64::EPSILON);
        assert_eq!(average([]), None);
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            Rating::new(9).unwrap_err().to_string(),
            "rating must be between 1 and 5, got 9"
        );
    }
}
