mod client;
mod error;
mod types;

pub use client::ApiClient;
pub use error::ApiError;
pub use types::{
    DashboardAnalytics, DashboardQuery, DifficultyBucket, GenerateRequest, GenerateResponse,
    IllugenVariation, LabelSchema, ModelTestingResultPayload, ModelTestingSample,
    ModelTestingSchema, NextPrompt, Prompt, PromptUpdate, ResultUpdate, ResultsQuery,
    RotationQuery, SamplesResponse, ScorePayload, SendPromptRequest, SendPromptResponse,
    TestResult, UploadedNote, VersionStats,
};
