use std::env;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::model::{QuestionOutcome, SessionSummary};
use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::error::ResultsClientError;

const RESULTS_PATH: &str = "sessions/results";

#[derive(Clone, Debug)]
pub struct ResultsClientConfig {
    pub base_url: Url,
    pub token: Option<String>,
}

impl ResultsClientConfig {
    /// Build a config from a raw base URL.
    ///
    /// # Errors
    ///
    /// Returns `ResultsClientError::InvalidBaseUrl` unless the URL parses as http(s).
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ResultsClientError> {
        let mut parsed = Url::parse(base_url.trim())
            .map_err(|e| ResultsClientError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ResultsClientError::InvalidBaseUrl(format!(
                "{base_url}: unsupported scheme"
            )));
        }
        // Url::join treats a base without a trailing slash as a file.
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }
        let token = token.filter(|t| !t.trim().is_empty());
        Ok(Self {
            base_url: parsed,
            token,
        })
    }

    /// Reads `EXAM_RESULTS_URL` and `EXAM_RESULTS_TOKEN`.
    ///
    /// Returns `Ok(None)` when no URL is configured.
    ///
    /// # Errors
    ///
    /// Returns `ResultsClientError::InvalidBaseUrl` for a malformed URL.
    pub fn from_env() -> Result<Option<Self>, ResultsClientError> {
        let Ok(base_url) = env::var("EXAM_RESULTS_URL") else {
            return Ok(None);
        };
        if base_url.trim().is_empty() {
            return Ok(None);
        }
        let token = env::var("EXAM_RESULTS_TOKEN").ok();
        Self::new(&base_url, token).map(Some)
    }

    /// # Errors
    ///
    /// Returns `ResultsClientError::InvalidBaseUrl` if the endpoint cannot be joined.
    pub fn endpoint(&self) -> Result<Url, ResultsClientError> {
        self.base_url
            .join(RESULTS_PATH)
            .map_err(|e| ResultsClientError::InvalidBaseUrl(e.to_string()))
    }
}

/// Receives graded summaries once a session ends.
#[async_trait]
pub trait ResultSubmitter: Send + Sync {
    /// # Errors
    ///
    /// Returns `ResultsClientError` when the summary could not be delivered.
    async fn submit(&self, summary: &SessionSummary) -> Result<(), ResultsClientError>;
}

/// Posts session results to the backend as JSON.
#[derive(Clone)]
pub struct ResultsClient {
    client: Client,
    config: Option<ResultsClientConfig>,
}

impl ResultsClient {
    /// # Errors
    ///
    /// Returns `ResultsClientError::InvalidBaseUrl` for a malformed `EXAM_RESULTS_URL`.
    pub fn from_env() -> Result<Self, ResultsClientError> {
        Ok(Self::new(ResultsClientConfig::from_env()?))
    }

    #[must_use]
    pub fn new(config: Option<ResultsClientConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }
}

#[async_trait]
impl ResultSubmitter for ResultsClient {
    async fn submit(&self, summary: &SessionSummary) -> Result<(), ResultsClientError> {
        let config = self.config.as_ref().ok_or(ResultsClientError::Disabled)?;
        let payload = ResultPayload::from_summary(summary);

        let mut request = self.client.post(config.endpoint()?).json(&payload);
        if let Some(token) = &config.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(ResultsClientError::HttpStatus(response.status()));
        }
        Ok(())
    }
}

/// Wire shape of a submitted result.
#[derive(Debug, Serialize)]
pub struct ResultPayload<'a> {
    session_id: String,
    mode: &'static str,
    end_reason: &'static str,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    time_taken_millis: u64,
    total_questions: usize,
    questions_answered: u32,
    correct_count: u32,
    incorrect_count: u32,
    accuracy_percent: f64,
    per_question: &'a [QuestionOutcome],
}

impl<'a> ResultPayload<'a> {
    #[must_use]
    pub fn from_summary(summary: &'a SessionSummary) -> Self {
        Self {
            session_id: summary.session_id().to_string(),
            mode: summary.mode().as_str(),
            end_reason: summary.end_reason().as_str(),
            started_at: summary.started_at(),
            ended_at: summary.ended_at(),
            time_taken_millis: summary.time_taken_millis(),
            total_questions: summary.total_questions(),
            questions_answered: summary.questions_answered(),
            correct_count: summary.correct_count(),
            incorrect_count: summary.incorrect_count(),
            accuracy_percent: summary.accuracy_percent(),
            per_question: summary.per_question(),
        }
    }
}
