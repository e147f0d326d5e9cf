use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: i64,
    pub text: String,
    pub difficulty: u8,
    #[serde(default)]
    pub drum_type: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub used_count: i64,
    #[serde(default)]
    pub is_user_generated: bool,
}

/// Fields accepted by `PUT /api/prompts/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct PromptUpdate {
    pub text: String,
    pub difficulty: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drum_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Result of asking the server for the next prompt in rotation. When the pool
/// for the requested position is exhausted the server answers with a plain
/// `{message}` object; that message is shown to the user verbatim.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NextPrompt {
    Prompt(Prompt),
    Exhausted { message: String },
}

/// Query half of the server-driven prompt rotation. The client never selects
/// prompts locally; it only reports where the rotation currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationQuery {
    /// First load of a session: the server resets to the lowest difficulty of
    /// the first drum type in its rotation order.
    StartFromBeginning,
    /// Advance past the just-completed prompt.
    Continue {
        current_drum_type: String,
        current_difficulty: u8,
        exclude_id: i64,
    },
}

impl RotationQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            RotationQuery::StartFromBeginning => {
                vec![("start_from_beginning", "true".to_string())]
            }
            RotationQuery::Continue {
                current_drum_type,
                current_difficulty,
                exclude_id,
            } => vec![
                ("current_drum_type", current_drum_type.clone()),
                ("current_difficulty", current_difficulty.to_string()),
                ("exclude_id", exclude_id.to_string()),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SendPromptRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub model_version: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub illugen: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub illugen_sfx_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendPromptResponse {
    #[serde(default)]
    pub prompt_id: Option<i64>,
    #[serde(default)]
    pub difficulty: Option<u8>,
    pub llm_controls: Value,
    #[serde(default)]
    pub llm_response: String,
    pub audio_id: String,
    pub audio_url: String,
    #[serde(default)]
    pub drum_type: Option<String>,
    #[serde(default)]
    pub illugen_generation_id: Option<i64>,
    #[serde(default)]
    pub illugen_variations: Option<Vec<IllugenVariation>>,
    #[serde(default)]
    pub illugen_error: Option<String>,
}

/// One generated variation from the Illugen comparison service. Transient and
/// request-scoped; only referenced from a result's notes if the user attaches
/// it before submitting.
#[derive(Debug, Clone, Deserialize)]
pub struct IllugenVariation {
    pub serve_path: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScorePayload {
    pub audio_quality_score: u8,
    pub llm_accuracy_score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_json: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_file_path: Option<String>,
    pub model_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_audio_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_text_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_text_drum_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_text_difficulty: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_text_category: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestResult {
    pub id: i64,
    #[serde(default)]
    pub prompt_id: Option<i64>,
    pub audio_quality_score: u8,
    pub llm_accuracy_score: u8,
    #[serde(default)]
    pub generated_json: Option<Value>,
    #[serde(default)]
    pub llm_response: Option<String>,
    #[serde(default)]
    pub audio_id: Option<String>,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub tested_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultUpdate {
    pub audio_quality_score: u8,
    pub llm_accuracy_score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultsQuery {
    pub drum_type: Option<String>,
    pub difficulty: Option<u8>,
    pub model_version: Option<String>,
    pub audio_quality_score: Option<u8>,
}

impl ResultsQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(drum_type) = &self.drum_type {
            params.push(("drum_type", drum_type.clone()));
        }
        if let Some(difficulty) = self.difficulty {
            params.push(("difficulty", difficulty.to_string()));
        }
        if let Some(version) = &self.model_version {
            params.push(("model_version", version.clone()));
        }
        if let Some(score) = self.audio_quality_score {
            params.push(("audio_quality_score", score.to_string()));
        }
        params
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardQuery {
    pub drum_type: Option<String>,
    pub model_version: Option<String>,
}

impl DashboardQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(drum_type) = &self.drum_type {
            params.push(("drum_type", drum_type.clone()));
        }
        if let Some(version) = &self.model_version {
            params.push(("model_version", version.clone()));
        }
        params
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardAnalytics {
    pub total_tests: u64,
    #[serde(default)]
    pub overall_generation_score: f64,
    #[serde(default)]
    pub avg_llm_accuracy: f64,
    #[serde(default)]
    pub difficulty_distribution: Vec<DifficultyBucket>,
    #[serde(default)]
    pub by_version: Vec<VersionStats>,
}

/// One column of the difficulty heat map. `score_distribution` keys are the
/// score values 1..=10 as strings (JSON object keys).
#[derive(Debug, Clone, Deserialize)]
pub struct DifficultyBucket {
    pub difficulty: u8,
    pub total_tests: u64,
    #[serde(default)]
    pub score_distribution: BTreeMap<String, u64>,
}

impl DifficultyBucket {
    pub fn count_for(&self, score: u8) -> u64 {
        self.score_distribution
            .get(&score.to_string())
            .copied()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionStats {
    pub version: String,
    pub count: u64,
    #[serde(default)]
    pub generation_score: f64,
    #[serde(default)]
    pub avg_llm: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadedNote {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelTestingSchema {
    #[serde(default)]
    pub conditioning_params: Vec<String>,
    #[serde(default)]
    pub label_schema: LabelSchema,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelSchema {
    /// Label name -> option name -> backend code. Only the option names matter
    /// to the client.
    #[serde(default)]
    pub dictionaries: BTreeMap<String, BTreeMap<String, Value>>,
    #[serde(default)]
    pub multi_value_cols: Vec<String>,
}

impl LabelSchema {
    pub fn is_multi_value(&self, label: &str) -> bool {
        self.multi_value_cols.iter().any(|c| c == label)
    }

    pub fn options(&self, label: &str) -> Vec<String> {
        self.dictionaries
            .get(label)
            .map(|dict| dict.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelTestingSample {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub dataset: Option<String>,
    pub filename: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub tags: Value,
    #[serde(default)]
    pub raw_sample: Value,
    #[serde(default)]
    pub source_json_for_model: Option<Value>,
    #[serde(default)]
    pub source_audio_url: Option<String>,
    pub source_audio_proxy_url: String,
}

impl ModelTestingSample {
    /// The JSON the generation endpoint expects as the source sample.
    pub fn model_input(&self) -> &Value {
        self.source_json_for_model.as_ref().unwrap_or(&self.raw_sample)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplesResponse {
    #[serde(default)]
    pub samples: Vec<ModelTestingSample>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub sample: Value,
    pub tags: Value,
    pub temperature: f64,
    pub width: f64,
    pub sliders: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub audio_id: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub audio_file_path: Option<String>,
    #[serde(default)]
    pub applied_tags: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelTestingResultPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_dataset: Option<String>,
    pub source_filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_audio_url: Option<String>,
    pub source_metadata: Value,
    pub applied_tags: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_audio_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_audio_path: Option<String>,
    pub score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_prompt_parses_prompt() {
        let json = r#"{"id": 7, "text": "punchy kick", "difficulty": 3, "drum_type": "kick"}"#;
        let next: NextPrompt = serde_json::from_str(json).expect("parse");
        match next {
            NextPrompt::Prompt(p) => {
                assert_eq!(p.id, 7);
                assert_eq!(p.difficulty, 3);
                assert_eq!(p.drum_type.as_deref(), Some("kick"));
            }
            NextPrompt::Exhausted { .. } => panic!("expected a prompt"),
        }
    }

    #[test]
    fn test_next_prompt_parses_exhaustion_message() {
        let json = r#"{"message": "All prompts have been tested."}"#;
        let next: NextPrompt = serde_json::from_str(json).expect("parse");
        match next {
            NextPrompt::Exhausted { message } => {
                assert_eq!(message, "All prompts have been tested.");
            }
            NextPrompt::Prompt(_) => panic!("expected exhaustion"),
        }
    }

    #[test]
    fn test_rotation_query_initial_has_no_position_hints() {
        let params = RotationQuery::StartFromBeginning.params();
        assert_eq!(params, vec![("start_from_beginning", "true".to_string())]);
        assert!(params.iter().all(|(k, _)| !k.starts_with("current_")));
    }

    #[test]
    fn test_rotation_query_continue_carries_position() {
        let query = RotationQuery::Continue {
            current_drum_type: "snare".to_string(),
            current_difficulty: 4,
            exclude_id: 91,
        };
        let params = query.params();
        assert!(params.contains(&("current_drum_type", "snare".to_string())));
        assert!(params.contains(&("current_difficulty", "4".to_string())));
        assert!(params.contains(&("exclude_id", "91".to_string())));
    }

    #[test]
    fn test_send_prompt_request_omits_unset_fields() {
        let request = SendPromptRequest {
            prompt_id: Some(3),
            text: None,
            model_version: "v12".to_string(),
            illugen: false,
            illugen_sfx_type: None,
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["prompt_id"], 3);
        assert!(json.get("text").is_none());
        assert!(json.get("illugen").is_none());
        assert!(json.get("illugen_sfx_type").is_none());
    }

    #[test]
    fn test_score_payload_free_text_fields() {
        let payload = ScorePayload {
            audio_quality_score: 8,
            llm_accuracy_score: 6,
            model_version: "v12".to_string(),
            free_text_prompt: Some("tight rimshot".to_string()),
            free_text_drum_type: Some("snare".to_string()),
            free_text_difficulty: Some(5),
            free_text_category: Some("user-generated".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(json["free_text_prompt"], "tight rimshot");
        assert!(json.get("prompt_id").is_none());
    }

    #[test]
    fn test_results_query_params_skip_unset_filters() {
        let query = ResultsQuery {
            drum_type: Some("snare".to_string()),
            audio_quality_score: Some(7),
            ..Default::default()
        };
        let params = query.params();
        assert_eq!(params.len(), 2);
        assert!(params.contains(&("drum_type", "snare".to_string())));
        assert!(params.contains(&("audio_quality_score", "7".to_string())));
    }

    #[test]
    fn test_dashboard_analytics_score_distribution_lookup() {
        let json = r#"{
            "total_tests": 12,
            "overall_generation_score": 64,
            "avg_llm_accuracy": 7.4,
            "by_version": [{"version": "v12", "count": 12, "generation_score": 64, "avg_llm": 7.4}],
            "difficulty_distribution": [
                {"difficulty": 1, "total_tests": 5, "score_distribution": {"7": 2, "9": 3}}
            ]
        }"#;
        let analytics: DashboardAnalytics = serde_json::from_str(json).expect("parse");
        let bucket = &analytics.difficulty_distribution[0];
        assert_eq!(bucket.count_for(7), 2);
        assert_eq!(bucket.count_for(9), 3);
        assert_eq!(bucket.count_for(4), 0);
    }
}
