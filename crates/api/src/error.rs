use thiserror::Error;

/// Errors surfaced to the user as status text. `Display` is the message the
/// pages render, so the backend's `detail` string passes through unchanged.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Service(String),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    detail: String,
}

impl ApiError {
    /// Map a non-success HTTP status and its body to the message shown to the
    /// user: 502 gets a friendlier retry hint, everything else falls back to
    /// the backend's `detail` field or the bare status.
    pub fn from_status(status: u16, body: &str) -> Self {
        if status == 502 {
            return ApiError::Service(
                "Generation service temporarily unavailable. Please try again.".to_string(),
            );
        }
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => ApiError::Service(parsed.detail),
            Err(_) => ApiError::Service(format!("Request failed with status {status}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_passes_through() {
        let err = ApiError::from_status(404, r#"{"detail": "Prompt not found"}"#);
        assert_eq!(err.to_string(), "Prompt not found");
    }

    #[test]
    fn test_bad_gateway_gets_friendly_message() {
        let err = ApiError::from_status(502, r#"{"detail": "upstream exploded"}"#);
        assert!(err.to_string().contains("temporarily unavailable"));
    }

    #[test]
    fn test_unparseable_body_falls_back_to_status() {
        let err = ApiError::from_status(500, "<html>oops</html>");
        assert_eq!(err.to_string(), "Request failed with status 500");
    }
}
