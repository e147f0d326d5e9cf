use std::time::Duration;

use reqwest::blocking::Response;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::types::{
    DashboardAnalytics, DashboardQuery, GenerateRequest, GenerateResponse,
    ModelTestingResultPayload, ModelTestingSchema, NextPrompt, Prompt, PromptUpdate, ResultUpdate,
    ResultsQuery, RotationQuery, SamplesResponse, ScorePayload, SendPromptRequest,
    SendPromptResponse, TestResult, UploadedNote,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Blocking HTTP client for the scorer backend. One instance is shared by
/// every page; there is no retry, caching or auth handling, a failed request
/// always becomes a visible status message.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join a path or backend-relative URL onto the base URL. Absolute URLs
    /// pass through untouched (Illugen variation links are absolute).
    pub fn absolute(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let code = status.as_u16();
        let body = response.text().unwrap_or_default();
        tracing::warn!(status = code, "backend request failed");
        Err(ApiError::from_status(code, &body))
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = self.http.get(self.absolute(path)).query(params).send()?;
        Ok(Self::check(response)?.json()?)
    }

    fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.http.post(self.absolute(path)).json(body).send()?;
        Ok(Self::check(response)?.json()?)
    }

    fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.http.put(self.absolute(path)).json(body).send()?;
        Ok(Self::check(response)?.json()?)
    }

    fn delete(&self, path: &str) -> Result<(), ApiError> {
        let response = self.http.delete(self.absolute(path)).send()?;
        Self::check(response)?;
        Ok(())
    }

    // Prompts

    pub fn list_prompts(&self, limit: usize) -> Result<Vec<Prompt>, ApiError> {
        self.get_json("/api/prompts/", &[("limit", limit.to_string())])
    }

    pub fn get_prompt(&self, id: i64) -> Result<Prompt, ApiError> {
        self.get_json(&format!("/api/prompts/{id}"), &[])
    }

    pub fn update_prompt(&self, id: i64, update: &PromptUpdate) -> Result<Prompt, ApiError> {
        self.put_json(&format!("/api/prompts/{id}"), update)
    }

    pub fn delete_prompt(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/api/prompts/{id}"))
    }

    pub fn next_in_rotation(&self, query: &RotationQuery) -> Result<NextPrompt, ApiError> {
        self.get_json("/api/prompts/next-in-rotation", &query.params())
    }

    pub fn random_prompt(&self, exclude_id: Option<i64>) -> Result<Prompt, ApiError> {
        let params = match exclude_id {
            Some(id) => vec![("exclude_id", id.to_string())],
            None => Vec::new(),
        };
        self.get_json("/api/prompts/random", &params)
    }

    // Generation + scoring

    pub fn send_prompt(
        &self,
        request: &SendPromptRequest,
    ) -> Result<SendPromptResponse, ApiError> {
        self.post_json("/api/test/send-prompt", request)
    }

    pub fn submit_score(&self, payload: &ScorePayload) -> Result<TestResult, ApiError> {
        self.post_json("/api/results/score", payload)
    }

    pub fn list_results(&self, query: &ResultsQuery) -> Result<Vec<TestResult>, ApiError> {
        self.get_json("/api/results/", &query.params())
    }

    pub fn update_result(&self, id: i64, update: &ResultUpdate) -> Result<TestResult, ApiError> {
        self.put_json(&format!("/api/results/{id}"), update)
    }

    pub fn delete_result(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/api/results/{id}"))
    }

    pub fn dashboard(&self, query: &DashboardQuery) -> Result<DashboardAnalytics, ApiError> {
        self.get_json("/api/results/dashboard", &query.params())
    }

    /// Upload a local audio file to attach to a result's notes. Only the
    /// returned server path is kept; the local file itself is never drafted.
    pub fn upload_note_audio(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedNote, ApiError> {
        let part = reqwest::blocking::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("audio/wav")?;
        let form = reqwest::blocking::multipart::Form::new().part("file", part);
        let response = self
            .http
            .post(self.absolute("/api/results/upload-note-audio"))
            .multipart(form)
            .send()?;
        Ok(Self::check(response)?.json()?)
    }

    /// Fetch generated audio as raw bytes. The URL may be backend-relative
    /// (`/api/audio/{id}`) or absolute.
    pub fn fetch_audio(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.http.get(self.absolute(url)).send()?;
        let response = Self::check(response)?;
        Ok(response.bytes()?.to_vec())
    }

    // Acoustic model testing

    pub fn model_testing_schema(&self) -> Result<ModelTestingSchema, ApiError> {
        self.get_json("/api/model-testing/schema", &[])
    }

    pub fn model_testing_samples(
        &self,
        drum_type: &str,
        limit: usize,
    ) -> Result<SamplesResponse, ApiError> {
        self.get_json(
            "/api/model-testing/samples",
            &[
                ("drum_type", drum_type.to_string()),
                ("limit", limit.to_string()),
            ],
        )
    }

    pub fn model_testing_generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, ApiError> {
        self.post_json("/api/model-testing/generate", request)
    }

    pub fn submit_model_testing_result(
        &self,
        payload: &ModelTestingResultPayload,
    ) -> Result<serde_json::Value, ApiError> {
        self.post_json("/api/model-testing/results", payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_normalized() {
        let client = ApiClient::new("http://localhost:8000/").expect("client");
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(
            client.absolute("/api/prompts/"),
            "http://localhost:8000/api/prompts/"
        );
    }

    #[test]
    fn test_absolute_urls_pass_through() {
        let client = ApiClient::new("http://localhost:8000").expect("client");
        assert_eq!(
            client.absolute("https://cdn.example.com/a.wav"),
            "https://cdn.example.com/a.wav"
        );
    }

    #[test]
    fn test_relative_path_without_slash() {
        let client = ApiClient::new("http://localhost:8000").expect("client");
        assert_eq!(client.absolute("health"), "http://localhost:8000/health");
    }
}
