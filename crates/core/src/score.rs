use serde::{Deserialize, Serialize};

/// Closed integer range with a fixed step. Every interaction path funnels
/// through [`ScoreRange::snap`], so a score can never leave the range or land
/// between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub min: i32,
    pub max: i32,
    pub step: i32,
}

/// Quality scores: 0..=10 in steps of 1.
pub const SCORE_0_TO_10: ScoreRange = ScoreRange {
    min: 0,
    max: 10,
    step: 1,
};

/// Acoustic model-testing score: 0..=100 in steps of 10.
pub const SCORE_0_TO_100_BY_10: ScoreRange = ScoreRange {
    min: 0,
    max: 100,
    step: 10,
};

impl ScoreRange {
    pub fn snap(&self, value: i32) -> i32 {
        let stepped = ((value as f64 / self.step as f64).round() as i32) * self.step;
        stepped.clamp(self.min, self.max)
    }

    pub fn snap_f64(&self, value: f64) -> i32 {
        let stepped = ((value / self.step as f64).round() as i32) * self.step;
        stepped.clamp(self.min, self.max)
    }
}

/// Origin of a drag gesture; captured on pointer-down so the whole drag maps
/// pixel deltas against one fixed starting value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragOrigin {
    start_value: i32,
}

/// An integer score control's state. `None` is the distinct "not yet scored"
/// sentinel; wheel, drag, arrows and typed entry all resolve through the same
/// snapped setter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreInput {
    range: ScoreRange,
    value: Option<i32>,
    editing: Option<String>,
}

impl ScoreInput {
    pub fn unset(range: ScoreRange) -> Self {
        Self {
            range,
            value: None,
            editing: None,
        }
    }

    pub fn with_value(range: ScoreRange, value: i32) -> Self {
        Self {
            range,
            value: Some(range.snap(value)),
            editing: None,
        }
    }

    pub fn range(&self) -> ScoreRange {
        self.range
    }

    pub fn value(&self) -> Option<i32> {
        self.value
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    pub fn set(&mut self, raw: i32) {
        self.value = Some(self.range.snap(raw));
    }

    pub fn clear(&mut self) {
        self.value = None;
        self.editing = None;
    }

    /// One wheel tick or arrow press: direction only, magnitude ignored.
    /// An unset control steps relative to the range minimum.
    pub fn step(&mut self, direction: i32) {
        let base = self.value.unwrap_or(self.range.min);
        self.set(base + direction.signum() * self.range.step);
    }

    pub fn begin_drag(&self) -> DragOrigin {
        DragOrigin {
            start_value: self.value.unwrap_or(self.range.min),
        }
    }

    /// Apply a drag: `steps` is the (signed) number of whole pixel-quanta the
    /// pointer has travelled since `begin_drag`.
    pub fn drag_to(&mut self, origin: DragOrigin, steps: i32) {
        self.set(origin.start_value + steps * self.range.step);
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    /// Enter direct-entry mode, seeding the buffer with the current value.
    pub fn begin_edit(&mut self) {
        let seed = self.value.map(|v| v.to_string()).unwrap_or_default();
        self.editing = Some(seed);
    }

    pub fn edit_text_mut(&mut self) -> Option<&mut String> {
        self.editing.as_mut()
    }

    /// Commit the typed text: a parseable number is snapped and clamped, an
    /// unparseable one reverts to the last committed value.
    pub fn commit_edit(&mut self) {
        if let Some(text) = self.editing.take() {
            match text.trim().parse::<f64>() {
                Ok(parsed) if parsed.is_finite() => {
                    self.value = Some(self.range.snap_f64(parsed));
                }
                _ => {}
            }
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_clamps_to_range() {
        assert_eq!(SCORE_0_TO_10.snap(15), 10);
        assert_eq!(SCORE_0_TO_10.snap(-3), 0);
        assert_eq!(SCORE_0_TO_10.snap(7), 7);
    }

    #[test]
    fn test_snap_rounds_to_step() {
        assert_eq!(SCORE_0_TO_100_BY_10.snap(44), 40);
        assert_eq!(SCORE_0_TO_100_BY_10.snap(45), 50);
        assert_eq!(SCORE_0_TO_100_BY_10.snap(101), 100);
    }

    #[test]
    fn test_wheel_direction_only_moves_one_step() {
        let mut score = ScoreInput::with_value(SCORE_0_TO_10, 5);
        score.step(3); // large delta still means one tick
        assert_eq!(score.value(), Some(6));
        score.step(-1);
        assert_eq!(score.value(), Some(5));
    }

    #[test]
    fn test_step_clamps_at_bounds() {
        let mut score = ScoreInput::with_value(SCORE_0_TO_10, 10);
        score.step(1);
        assert_eq!(score.value(), Some(10));
        let mut score = ScoreInput::with_value(SCORE_0_TO_10, 0);
        score.step(-1);
        assert_eq!(score.value(), Some(0));
    }

    #[test]
    fn test_unset_steps_from_minimum() {
        let mut score = ScoreInput::unset(SCORE_0_TO_10);
        assert!(!score.is_set());
        score.step(1);
        assert_eq!(score.value(), Some(1));
    }

    #[test]
    fn test_drag_maps_steps_from_origin() {
        let mut score = ScoreInput::with_value(SCORE_0_TO_10, 5);
        let origin = score.begin_drag();
        score.drag_to(origin, 3);
        assert_eq!(score.value(), Some(8));
        // Same origin, new delta: not cumulative.
        score.drag_to(origin, -2);
        assert_eq!(score.value(), Some(3));
        score.drag_to(origin, 99);
        assert_eq!(score.value(), Some(10));
    }

    #[test]
    fn test_drag_with_step_ten() {
        let mut score = ScoreInput::with_value(SCORE_0_TO_100_BY_10, 50);
        let origin = score.begin_drag();
        score.drag_to(origin, 2);
        assert_eq!(score.value(), Some(70));
    }

    #[test]
    fn test_typed_entry_commits_clamped() {
        let mut score = ScoreInput::with_value(SCORE_0_TO_10, 5);
        score.begin_edit();
        *score.edit_text_mut().expect("editing") = "15".to_string();
        score.commit_edit();
        assert_eq!(score.value(), Some(10));
        assert!(!score.is_editing());
    }

    #[test]
    fn test_typed_garbage_reverts() {
        let mut score = ScoreInput::with_value(SCORE_0_TO_10, 7);
        score.begin_edit();
        *score.edit_text_mut().expect("editing") = "not a number".to_string();
        score.commit_edit();
        assert_eq!(score.value(), Some(7));
    }

    #[test]
    fn test_escape_discards_edit() {
        let mut score = ScoreInput::with_value(SCORE_0_TO_10, 7);
        score.begin_edit();
        *score.edit_text_mut().expect("editing") = "2".to_string();
        score.cancel_edit();
        assert_eq!(score.value(), Some(7));
        assert!(!score.is_editing());
    }

    #[test]
    fn test_every_path_yields_in_range_integer() {
        let mut score = ScoreInput::unset(SCORE_0_TO_100_BY_10);
        let origin = score.begin_drag();
        score.drag_to(origin, i32::MAX / 20);
        assert_eq!(score.value(), Some(100));
        score.begin_edit();
        *score.edit_text_mut().expect("editing") = "-9999".to_string();
        score.commit_edit();
        assert_eq!(score.value(), Some(0));
        score.begin_edit();
        *score.edit_text_mut().expect("editing") = "55.4".to_string();
        score.commit_edit();
        assert_eq!(score.value(), Some(60));
    }
}
