use scorer_api::{Prompt, ScorePayload, SendPromptResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tags the user assigns to a free-text prompt so the server can file the
/// created prompt correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeTextMeta {
    pub drum_type: String,
    pub difficulty: u8,
}

impl Default for FreeTextMeta {
    fn default() -> Self {
        Self {
            drum_type: String::new(),
            difficulty: 5,
        }
    }
}

/// The two ways a prompt reaches the generation backend. Fields only valid in
/// one mode live inside that variant, so handling is exhaustive instead of
/// branching on a flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PromptMode {
    Database { prompt: Option<Prompt> },
    FreeText { text: String, metadata: FreeTextMeta },
}

impl Default for PromptMode {
    fn default() -> Self {
        PromptMode::Database { prompt: None }
    }
}

/// Why a submit attempt was blocked locally. The offending control flashes;
/// no request is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitBlock {
    MissingPrompt,
    NothingGenerated,
    MissingDrumType,
    GenerationScoreUnset,
    LlmScoreUnset,
}

/// In-progress state of the testing page: the active prompt mode plus the
/// latest generation output. Drafted to the session store as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestingDraft {
    pub mode: PromptMode,
    stashed: Option<PromptMode>,
    pub llm_json: Option<Value>,
    pub llm_response: Option<String>,
    pub audio_url: Option<String>,
}

impl TestingDraft {
    pub fn is_free_text(&self) -> bool {
        matches!(self.mode, PromptMode::FreeText { .. })
    }

    /// Switch between database and free-text mode. Generation output belongs
    /// to the mode that produced it and is cleared; each mode's own fields
    /// (current prompt, free text and its tags) survive the round trip.
    pub fn toggle_mode(&mut self) {
        let other = self.stashed.take().unwrap_or_else(|| match self.mode {
            PromptMode::Database { .. } => PromptMode::FreeText {
                text: String::new(),
                metadata: FreeTextMeta::default(),
            },
            PromptMode::FreeText { .. } => PromptMode::Database { prompt: None },
        });
        self.stashed = Some(std::mem::replace(&mut self.mode, other));
        self.clear_generation();
    }

    pub fn set_prompt(&mut self, prompt: Prompt) {
        self.mode = PromptMode::Database {
            prompt: Some(prompt),
        };
        self.clear_generation();
    }

    pub fn current_prompt(&self) -> Option<&Prompt> {
        match &self.mode {
            PromptMode::Database { prompt } => prompt.as_ref(),
            PromptMode::FreeText { .. } => None,
        }
    }

    /// Whether the send button is enabled at all.
    pub fn can_send(&self) -> bool {
        match &self.mode {
            PromptMode::Database { prompt } => prompt.is_some(),
            PromptMode::FreeText { text, .. } => !text.trim().is_empty(),
        }
    }

    /// Record a generation response. In free-text mode the LLM's `Kind` field
    /// seeds the drum-type tag as a suggestion when the user has not picked
    /// one yet.
    pub fn set_generation(&mut self, response: &SendPromptResponse) {
        self.llm_json = Some(response.llm_controls.clone());
        self.llm_response = Some(response.llm_response.clone());
        self.audio_url = Some(response.audio_url.clone());

        if let PromptMode::FreeText { metadata, .. } = &mut self.mode {
            if metadata.drum_type.is_empty() {
                let kind = ["Kind", "kind", "KIND"]
                    .iter()
                    .find_map(|key| response.llm_controls.get(key))
                    .and_then(|v| v.as_str());
                if let Some(kind) = kind {
                    metadata.drum_type = kind.trim().to_lowercase();
                }
            }
        }
    }

    pub fn clear_generation(&mut self) {
        self.llm_json = None;
        self.llm_response = None;
        self.audio_url = None;
    }

    pub fn has_generation(&self) -> bool {
        self.llm_json.is_some() || self.audio_url.is_some()
    }

    /// Local gate before a score submission; the first unmet requirement
    /// blocks the action.
    pub fn validate_submit(
        &self,
        generation_score: Option<i32>,
        llm_score: Option<i32>,
    ) -> Result<(), SubmitBlock> {
        match &self.mode {
            PromptMode::Database { prompt } => {
                if prompt.is_none() {
                    return Err(SubmitBlock::MissingPrompt);
                }
            }
            PromptMode::FreeText { metadata, .. } => {
                if metadata.drum_type.trim().is_empty() {
                    return Err(SubmitBlock::MissingDrumType);
                }
            }
        }
        if !self.has_generation() {
            return Err(SubmitBlock::NothingGenerated);
        }
        if generation_score.is_none() {
            return Err(SubmitBlock::GenerationScoreUnset);
        }
        if llm_score.is_none() {
            return Err(SubmitBlock::LlmScoreUnset);
        }
        Ok(())
    }

    /// The audio id is the last path component of the generation's audio URL.
    pub fn audio_id(&self) -> Option<String> {
        let url = self.audio_url.as_deref()?;
        let id = url.rsplit('/').next().filter(|s| !s.is_empty())?;
        Some(id.to_string())
    }

    pub fn score_payload(
        &self,
        generation_score: u8,
        llm_score: u8,
        model_version: &str,
        notes: Option<String>,
        note_audio_path: Option<String>,
    ) -> ScorePayload {
        let audio_id = self.audio_id();
        let mut payload = ScorePayload {
            audio_quality_score: generation_score,
            llm_accuracy_score: llm_score,
            generated_json: self.llm_json.clone(),
            llm_response: self.llm_response.clone(),
            audio_file_path: audio_id
                .as_deref()
                .map(|id| format!("audio_files/{id}.wav")),
            audio_id,
            model_version: model_version.to_string(),
            notes,
            note_audio_path,
            ..Default::default()
        };

        match &self.mode {
            PromptMode::Database { prompt } => {
                payload.prompt_id = prompt.as_ref().map(|p| p.id);
            }
            PromptMode::FreeText { text, metadata } => {
                payload.free_text_prompt = Some(text.clone());
                payload.free_text_drum_type = Some(metadata.drum_type.clone());
                payload.free_text_difficulty = Some(metadata.difficulty);
                payload.free_text_category = Some("user-generated".to_string());
            }
        }

        payload
    }

    /// Post-submit cleanup. Free-text mode starts over with empty text and
    /// tags; database mode keeps the prompt slot for the rotation to refill.
    pub fn reset_after_submit(&mut self) {
        self.clear_generation();
        if let PromptMode::FreeText { text, metadata } = &mut self.mode {
            text.clear();
            *metadata = FreeTextMeta::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(id: i64) -> Prompt {
        Prompt {
            id,
            text: "deep 808 kick".to_string(),
            difficulty: 4,
            drum_type: Some("kick".to_string()),
            category: Some("electronic".to_string()),
            used_count: 2,
            is_user_generated: false,
        }
    }

    fn generation(audio_url: &str) -> SendPromptResponse {
        serde_json::from_value(serde_json::json!({
            "llm_controls": {"Kind": "Snare", "Body": "tight"},
            "llm_response": "interpreted as a snare",
            "audio_id": "abc123",
            "audio_url": audio_url,
        }))
        .expect("response")
    }

    #[test]
    fn test_toggle_clears_generation_but_preserves_free_text() {
        let mut draft = TestingDraft::default();
        draft.toggle_mode();
        if let PromptMode::FreeText { text, metadata } = &mut draft.mode {
            *text = "crunchy lo-fi snare".to_string();
            metadata.drum_type = "snare".to_string();
            metadata.difficulty = 7;
        } else {
            panic!("expected free text mode");
        }
        draft.set_generation(&generation("/api/audio/abc123"));
        assert!(draft.has_generation());

        draft.toggle_mode(); // back to database
        assert!(!draft.is_free_text());
        assert!(draft.llm_json.is_none());
        assert!(draft.llm_response.is_none());
        assert!(draft.audio_url.is_none());

        draft.toggle_mode(); // and forth again
        match &draft.mode {
            PromptMode::FreeText { text, metadata } => {
                assert_eq!(text, "crunchy lo-fi snare");
                assert_eq!(metadata.drum_type, "snare");
                assert_eq!(metadata.difficulty, 7);
            }
            PromptMode::Database { .. } => panic!("expected free text mode"),
        }
    }

    #[test]
    fn test_toggle_preserves_database_prompt() {
        let mut draft = TestingDraft::default();
        draft.set_prompt(prompt(9));
        draft.toggle_mode();
        draft.toggle_mode();
        assert_eq!(draft.current_prompt().map(|p| p.id), Some(9));
    }

    #[test]
    fn test_submit_blocked_when_generation_score_unset() {
        let mut draft = TestingDraft::default();
        draft.set_prompt(prompt(1));
        draft.set_generation(&generation("/api/audio/abc123"));

        let blocked = draft.validate_submit(None, Some(5));
        assert_eq!(blocked, Err(SubmitBlock::GenerationScoreUnset));
    }

    #[test]
    fn test_submit_blocked_without_prompt_or_drum_type() {
        let draft = TestingDraft::default();
        assert_eq!(
            draft.validate_submit(Some(5), Some(5)),
            Err(SubmitBlock::MissingPrompt)
        );

        let mut draft = TestingDraft::default();
        draft.toggle_mode();
        if let PromptMode::FreeText { text, .. } = &mut draft.mode {
            *text = "anything".to_string();
        }
        assert_eq!(
            draft.validate_submit(Some(5), Some(5)),
            Err(SubmitBlock::MissingDrumType)
        );
    }

    #[test]
    fn test_submit_allowed_when_complete() {
        let mut draft = TestingDraft::default();
        draft.set_prompt(prompt(1));
        draft.set_generation(&generation("/api/audio/abc123"));
        assert_eq!(draft.validate_submit(Some(8), Some(6)), Ok(()));
    }

    #[test]
    fn test_audio_id_is_last_url_component() {
        let mut draft = TestingDraft::default();
        draft.set_prompt(prompt(1));
        draft.set_generation(&generation("/api/audio/abc123"));
        assert_eq!(draft.audio_id().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_payload_for_database_mode() {
        let mut draft = TestingDraft::default();
        draft.set_prompt(prompt(17));
        draft.set_generation(&generation("/api/audio/abc123"));

        let payload = draft.score_payload(8, 6, "v12", None, None);
        assert_eq!(payload.prompt_id, Some(17));
        assert_eq!(payload.audio_id.as_deref(), Some("abc123"));
        assert_eq!(
            payload.audio_file_path.as_deref(),
            Some("audio_files/abc123.wav")
        );
        assert!(payload.free_text_prompt.is_none());
    }

    #[test]
    fn test_payload_for_free_text_mode() {
        let mut draft = TestingDraft::default();
        draft.toggle_mode();
        if let PromptMode::FreeText { text, metadata } = &mut draft.mode {
            *text = "paper-thin hi-hat".to_string();
            metadata.drum_type = "hihat".to_string();
            metadata.difficulty = 6;
        }
        draft.set_generation(&generation("/api/audio/xyz"));

        let payload = draft.score_payload(4, 9, "v13", Some("shimmery".to_string()), None);
        assert!(payload.prompt_id.is_none());
        assert_eq!(payload.free_text_prompt.as_deref(), Some("paper-thin hi-hat"));
        assert_eq!(payload.free_text_drum_type.as_deref(), Some("hihat"));
        assert_eq!(payload.free_text_difficulty, Some(6));
        assert_eq!(payload.free_text_category.as_deref(), Some("user-generated"));
        assert_eq!(payload.notes.as_deref(), Some("shimmery"));
    }

    #[test]
    fn test_llm_kind_suggests_drum_type_once() {
        let mut draft = TestingDraft::default();
        draft.toggle_mode();
        if let PromptMode::FreeText { text, .. } = &mut draft.mode {
            *text = "a snare".to_string();
        }
        draft.set_generation(&generation("/api/audio/a"));
        match &draft.mode {
            PromptMode::FreeText { metadata, .. } => assert_eq!(metadata.drum_type, "snare"),
            PromptMode::Database { .. } => panic!("expected free text mode"),
        }

        // A user-chosen tag is not overwritten by a later generation.
        if let PromptMode::FreeText { metadata, .. } = &mut draft.mode {
            metadata.drum_type = "tom".to_string();
        }
        draft.set_generation(&generation("/api/audio/b"));
        match &draft.mode {
            PromptMode::FreeText { metadata, .. } => assert_eq!(metadata.drum_type, "tom"),
            PromptMode::Database { .. } => panic!("expected free text mode"),
        }
    }

    #[test]
    fn test_reset_after_submit_in_free_text_mode() {
        let mut draft = TestingDraft::default();
        draft.toggle_mode();
        if let PromptMode::FreeText { text, metadata } = &mut draft.mode {
            *text = "something".to_string();
            metadata.drum_type = "clap".to_string();
        }
        draft.set_generation(&generation("/api/audio/a"));

        draft.reset_after_submit();
        assert!(!draft.has_generation());
        match &draft.mode {
            PromptMode::FreeText { text, metadata } => {
                assert!(text.is_empty());
                assert_eq!(*metadata, FreeTextMeta::default());
            }
            PromptMode::Database { .. } => panic!("expected free text mode"),
        }
    }
}
