//! Running mean of active review grades.
//!
//! The mean is updated incrementally instead of being recomputed from the
//! review table, so floating-point drift can accumulate over many
//! delete/restore toggles. Callers own `reviews_count` and adjust it after
//! applying one of these functions.

/// Mean after one more review with `grade` joins `count` existing ones
pub fn apply_new_review(rating: f64, count: i32, grade: i32) -> f64 {
    (rating * f64::from(count) + f64::from(grade)) / f64::from(count + 1)
}

/// Mean after a review with `grade` leaves a set of `count` active reviews.
/// An empty set has mean 0.
pub fn apply_removed_review(rating: f64, count: i32, grade: i32) -> f64 {
    let remaining = count - 1;
    if remaining <= 0 {
        tracing::debug!("Last active review removed; rating reset to 0");
        return 0.0;
    }
    (rating * f64::from(count) - f64::from(grade)) / f64::from(remaining)
}

/// Mean after a previously removed review is reactivated
pub fn apply_restored_review(rating: f64, count: i32, grade: i32) -> f64 {
    apply_new_review(rating, count, grade)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn first_review_sets_rating_to_grade() {
        assert!(close(apply_new_review(0.0, 0, 4), 4.0));
    }

    #[test]
    fn add_then_remove_returns_to_empty() {
        let rating = apply_new_review(0.0, 0, 3);
        assert!(close(apply_removed_review(rating, 1, 3), 0.0));
    }

    #[test]
    fn removal_preserves_mean_of_remaining() {
        // grades 5, 3, 4 -> mean 4
        let mut rating = 0.0;
        let mut count = 0;
        for grade in [5, 3, 4] {
            rating = apply_new_review(rating, count, grade);
            count += 1;
        }
        assert!(close(rating, 4.0));

        // drop the 3 -> mean of {5, 4}
        rating = apply_removed_review(rating, count, 3);
        count -= 1;
        assert!(close(rating, 4.5));
        assert_eq!(count, 2);

        // restore it -> back to 4
        rating = apply_restored_review(rating, count, 3);
        assert!(close(rating, 4.0));
    }

    #[test]
    fn removal_from_empty_or_negative_count_is_zero() {
        assert_eq!(apply_removed_review(0.0, 0, 5), 0.0);
        assert_eq!(apply_removed_review(2.0, -1, 5), 0.0);
    }
}
