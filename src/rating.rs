// Rating Aggregator
// Keeps course.star_rating equal to the truncated mean of its review ratings

use anyhow::Result;
use rusqlite::Connection;

use crate::db::{get_course, get_ratings_for_course, set_star_rating};

/// Arithmetic mean truncated (not rounded) to two decimal places.
///
/// `[1, 2, 2]` → 1.66, `[3, 4]` → 3.5. Returns `None` for an empty slice.
/// The floor is taken on the exact integer quotient `sum * 100 / count`, so
/// no binary-float error can push a value below its true truncation. The
/// arithmetic is widened to `i128` so extreme ratings cannot overflow.
pub fn truncated_mean(ratings: &[i64]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }

    let sum: i128 = ratings.iter().map(|&r| i128::from(r)).sum();
    let count = ratings.len() as i128;
    let hundredths = (sum * 100).div_euclid(count);

    Some(hundredths as f64 / 100.0)
}

/// Recompute and persist the star rating for one course.
///
/// A missing course, or a course without reviews, is left untouched and
/// yields `Ok(None)`. Otherwise the stored rating is returned.
pub fn recompute(conn: &Connection, course_id: i64) -> Result<Option<f64>> {
    if get_course(conn, course_id)?.is_none() {
        tracing::debug!(course_id, "rating recompute skipped: no such course");
        return Ok(None);
    }

    let ratings = get_ratings_for_course(conn, course_id)?;
    let Some(star_rating) = truncated_mean(&ratings) else {
        return Ok(None);
    };

    set_star_rating(conn, course_id, star_rating)?;
    tracing::info!(course_id, star_rating, reviews = ratings.len(), "star rating recomputed");

    Ok(Some(star_rating))
}
