/// Pixel layout rules for the segmented distribution chart. Pure math so the
/// floor/rescale invariants are testable away from the painter.

/// Tallest bar, for the category with the highest test count.
pub const MAX_BAR_HEIGHT: f32 = 260.0;
/// Floor for non-empty bars so low-count categories stay visible.
pub const MIN_BAR_HEIGHT: f32 = 18.0;
/// Height of an empty category's outline.
pub const EMPTY_BAR_HEIGHT: f32 = 10.0;
/// Floor for a non-empty segment inside a bar.
pub const MIN_SEGMENT_HEIGHT: f32 = 8.0;

/// Columns whose tooltip opens to the left so it stays on screen.
const RIGHT_EDGE_COLUMNS: usize = 3;

pub fn bar_height(total: u64, max_total: u64) -> f32 {
    if total == 0 {
        return EMPTY_BAR_HEIGHT;
    }
    let max_total = max_total.max(1);
    ((total as f32 / max_total as f32) * MAX_BAR_HEIGHT).max(MIN_BAR_HEIGHT)
}

/// One stacked slice of a bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub score: u8,
    pub count: u64,
    pub height: f32,
}

/// Lay out the non-empty score buckets of one bar, in the stacking order
/// given. Each segment is proportional to its share of the bar, floored for
/// visibility; if the floors overflow the bar, all segments are rescaled
/// uniformly so they fit exactly.
pub fn layout_segments(counts: &[(u8, u64)], total: u64, bar_height: f32) -> Vec<Segment> {
    if total == 0 {
        return Vec::new();
    }

    let mut segments: Vec<Segment> = counts
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|&(score, count)| Segment {
            score,
            count,
            height: ((count as f32 / total as f32) * bar_height).max(MIN_SEGMENT_HEIGHT),
        })
        .collect();

    let sum: f32 = segments.iter().map(|s| s.height).sum();
    if sum > bar_height {
        let scale = bar_height / sum;
        for segment in &mut segments {
            segment.height *= scale;
        }
    }

    segments
}

pub fn tooltip_on_left(column_index: usize, column_count: usize) -> bool {
    column_index + RIGHT_EDGE_COLUMNS >= column_count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_height_is_proportional_to_max() {
        assert_eq!(bar_height(50, 100), MAX_BAR_HEIGHT / 2.0);
        assert_eq!(bar_height(100, 100), MAX_BAR_HEIGHT);
    }

    #[test]
    fn test_small_bars_get_the_floor() {
        assert_eq!(bar_height(1, 1000), MIN_BAR_HEIGHT);
    }

    #[test]
    fn test_empty_bars_keep_outline_height() {
        assert_eq!(bar_height(0, 100), EMPTY_BAR_HEIGHT);
    }

    #[test]
    fn test_empty_buckets_are_dropped() {
        let segments = layout_segments(&[(10, 0), (7, 4), (3, 0), (1, 6)], 10, 200.0);
        let scores: Vec<u8> = segments.iter().map(|s| s.score).collect();
        assert_eq!(scores, vec![7, 1]);
    }

    #[test]
    fn test_segments_are_proportional() {
        let segments = layout_segments(&[(9, 3), (5, 1)], 4, 200.0);
        assert_eq!(segments[0].height, 150.0);
        assert_eq!(segments[1].height, 50.0);
    }

    #[test]
    fn test_tiny_segments_get_minimum_height() {
        let segments = layout_segments(&[(10, 1), (1, 999)], 1000, 200.0);
        assert_eq!(segments[0].height, MIN_SEGMENT_HEIGHT);
    }

    #[test]
    fn test_overflowing_floors_rescale_to_fit_exactly() {
        // 5 buckets of 1 in a bar only 20px tall: floors alone would need 40px.
        let counts = [(10, 1), (8, 1), (6, 1), (4, 1), (2, 1)];
        let segments = layout_segments(&counts, 5, 20.0);
        let sum: f32 = segments.iter().map(|s| s.height).sum();
        assert!((sum - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_segment_sum_never_exceeds_bar_height() {
        for total in [1u64, 7, 40, 1000] {
            let counts: Vec<(u8, u64)> = (1..=10).map(|s| (s as u8, total / 10 + 1)).collect();
            let real_total: u64 = counts.iter().map(|(_, c)| c).sum();
            let bar = bar_height(real_total, real_total);
            let segments = layout_segments(&counts, real_total, bar);
            let sum: f32 = segments.iter().map(|s| s.height).sum();
            assert!(sum <= bar + 1e-3, "sum {sum} exceeds bar {bar}");
        }
    }

    #[test]
    fn test_tooltip_flips_near_right_edge() {
        assert!(!tooltip_on_left(0, 10));
        assert!(!tooltip_on_left(6, 10));
        assert!(tooltip_on_left(7, 10));
        assert!(tooltip_on_left(9, 10));
    }
}
