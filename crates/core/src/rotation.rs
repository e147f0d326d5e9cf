use scorer_api::{Prompt, RotationQuery};

/// Client half of the server-driven prompt rotation. Only the position of the
/// just-completed prompt is held; the selection itself happens server-side
/// and every "next" is a fresh round-trip.
#[derive(Debug, Clone, Default)]
pub struct RotationCursor {
    current: Option<(String, u8, i64)>,
}

impl RotationCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query for the next prompt: the first call of a session starts the
    /// rotation from the beginning, later calls carry the current position so
    /// the server can advance it and avoid an immediate repeat.
    pub fn query(&self) -> RotationQuery {
        match &self.current {
            None => RotationQuery::StartFromBeginning,
            Some((drum_type, difficulty, id)) => RotationQuery::Continue {
                current_drum_type: drum_type.clone(),
                current_difficulty: *difficulty,
                exclude_id: *id,
            },
        }
    }

    /// Record the prompt the server handed out as the new rotation position.
    pub fn advance(&mut self, prompt: &Prompt) {
        self.current = Some((
            prompt.drum_type.clone().unwrap_or_default(),
            prompt.difficulty,
            prompt.id,
        ));
    }

    /// Id to exclude from a "random" request, if a prompt is on screen.
    pub fn exclude_id(&self) -> Option<i64> {
        self.current.as_ref().map(|(_, _, id)| *id)
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(id: i64, drum_type: &str, difficulty: u8) -> Prompt {
        Prompt {
            id,
            text: "test".to_string(),
            difficulty,
            drum_type: Some(drum_type.to_string()),
            category: None,
            used_count: 0,
            is_user_generated: false,
        }
    }

    #[test]
    fn test_first_query_starts_from_beginning() {
        let cursor = RotationCursor::new();
        assert_eq!(cursor.query(), RotationQuery::StartFromBeginning);
        assert_eq!(cursor.exclude_id(), None);
    }

    #[test]
    fn test_next_query_excludes_current_prompt() {
        let mut cursor = RotationCursor::new();
        cursor.advance(&prompt(42, "snare", 6));

        match cursor.query() {
            RotationQuery::Continue {
                current_drum_type,
                current_difficulty,
                exclude_id,
            } => {
                assert_eq!(current_drum_type, "snare");
                assert_eq!(current_difficulty, 6);
                assert_eq!(exclude_id, 42);
            }
            RotationQuery::StartFromBeginning => panic!("cursor should continue"),
        }
        assert_eq!(cursor.exclude_id(), Some(42));
    }

    #[test]
    fn test_reset_returns_to_beginning() {
        let mut cursor = RotationCursor::new();
        cursor.advance(&prompt(1, "kick", 1));
        cursor.reset();
        assert_eq!(cursor.query(), RotationQuery::StartFromBeginning);
    }
}
