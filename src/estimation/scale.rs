//! The fixed story-point scale and the snapping rules shared by every
//! estimation path.

/// Story-point values every estimate is reported on.
pub const FIBONACCI_SCALE: [u32; 7] = [1, 2, 3, 5, 8, 13, 21];

/// Lowest and highest raw score accepted before snapping.
pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 21;

/// Whether `points` is a member of the scale.
pub fn is_on_scale(points: i64) -> bool {
    FIBONACCI_SCALE.iter().any(|&p| i64::from(p) == points)
}

/// Snap an arbitrary score to the nearest scale value.
///
/// Scans the scale in ascending order and only replaces the incumbent on a
/// strictly smaller distance, so an exact tie resolves to the lower value
/// (4 → 3, not 5).
pub fn snap_to_scale(score: i64) -> u32 {
    let mut closest = FIBONACCI_SCALE[0];
    let mut min_diff = (i64::from(closest) - score).abs();

    for &point in &FIBONACCI_SCALE[1..] {
        let diff = (i64::from(point) - score).abs();
        if diff < min_diff {
            min_diff = diff;
            closest = point;
        }
    }

    closest
}

/// Clamp a raw score into `[MIN_SCORE, MAX_SCORE]`.
pub fn clamp_score(score: i64) -> i64 {
    score.clamp(MIN_SCORE, MAX_SCORE)
}

/// Position of `points` on the scale, used as the classifier label.
pub fn points_to_index(points: u32) -> Option<usize> {
    FIBONACCI_SCALE.iter().position(|&p| p == points)
}

/// Inverse of [`points_to_index`]; out-of-range indices are clamped.
pub fn index_to_points(index: usize) -> u32 {
    FIBONACCI_SCALE[index.min(FIBONACCI_SCALE.len() - 1)]
}
