//! Client for the generateContent text-generation endpoint.
//!
//! One synchronous request per question, with two pacing mechanisms:
//! a preventive cooldown after every batch of requests, and a bounded
//! retry loop when the service signals rate limiting (HTTP 429).

use crate::config::{ModelConfig, QuestionCatalog};
use crate::gemini::prompt;
use crate::models::FrequencyDistribution;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Substituted when the service answers successfully but returns no usable
/// text; the report still completes for that question.
pub const NO_ANALYSIS_SENTINEL: &str = "No analysis was returned for this question.";

/// Enrichment failure. All variants abort the run: the document is only
/// saved at the very end, so nothing partial is written.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("request to text-generation service failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("text-generation service returned status {status}: {body}")]
    Service { status: u16, body: String },

    #[error("rate limit persisted after {attempts} attempts")]
    ThrottleExhausted { attempts: usize },
}

/// generateContent request payload.
#[derive(Debug, Clone, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

/// generateContent response body. Anything outside this shape is treated
/// as "no usable text".
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

/// Outcome of a single HTTP exchange, before retry policy is applied.
pub(crate) enum ServiceReply {
    Success(GenerateResponse),
    RateLimited,
    Failed { status: u16, body: String },
}

/// Issue `call` until it succeeds, retrying on rate limiting with a fixed
/// cooldown between attempts, up to `retries` retries.
///
/// Every retry reissues the identical request; any non-throttle failure is
/// terminal immediately.
pub(crate) async fn request_with_retry<F, Fut>(
    retries: usize,
    cooldown: Duration,
    mut call: F,
) -> Result<GenerateResponse, EnrichError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ServiceReply, EnrichError>>,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        match call().await? {
            ServiceReply::Success(response) => return Ok(response),
            ServiceReply::Failed { status, body } => {
                return Err(EnrichError::Service { status, body });
            }
            ServiceReply::RateLimited => {
                if attempts > retries {
                    return Err(EnrichError::ThrottleExhausted { attempts });
                }
                warn!(
                    "Rate limited; cooling down {}s before retry {}/{}",
                    cooldown.as_secs(),
                    attempts,
                    retries
                );
                tokio::time::sleep(cooldown).await;
            }
        }
    }
}

/// Pull the first generated text out of a response.
pub(crate) fn extract_text(response: &GenerateResponse) -> Option<String> {
    response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .and_then(|content| content.parts.first())
        .map(|part| part.text.clone())
        .filter(|text| !text.trim().is_empty())
}

/// Client for the per-question analysis calls.
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
    cooldown: Duration,
    requests_per_batch: u64,
    retries: usize,
}

impl GeminiClient {
    /// Build a client from the model settings and the externally supplied
    /// credential.
    pub fn new(config: &ModelConfig, api_key: String) -> Result<Self, EnrichError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.name.clone(),
            api_key,
            cooldown: Duration::from_secs(config.cooldown_seconds),
            requests_per_batch: config.requests_per_batch,
            retries: config.retries,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.api_base, self.model, self.api_key
        )
    }

    /// Produce the narrative analysis for one question.
    ///
    /// `request_seq` is the number of requests already issued in this run;
    /// whenever it reaches a multiple of the batch size, a preventive
    /// cooldown runs before the request goes out.
    pub async fn analyze(
        &self,
        question: &str,
        dist: &FrequencyDistribution,
        request_seq: u64,
        catalog: &QuestionCatalog,
    ) -> Result<String, EnrichError> {
        if request_seq > 0 && request_seq % self.requests_per_batch == 0 {
            info!(
                "Issued {} requests; pausing {}s before continuing",
                request_seq,
                self.cooldown.as_secs()
            );
            tokio::time::sleep(self.cooldown).await;
            debug!("Resuming requests");
        }

        let context = prompt::question_context(question, catalog);
        let text = prompt::build_prompt(question, &context, dist);
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text }],
            }],
        };
        let url = self.endpoint();

        let response =
            request_with_retry(self.retries, self.cooldown, || self.send_once(&url, &request))
                .await?;

        Ok(extract_text(&response).unwrap_or_else(|| NO_ANALYSIS_SENTINEL.to_string()))
    }

    async fn send_once(
        &self,
        url: &str,
        request: &GenerateRequest,
    ) -> Result<ServiceReply, EnrichError> {
        let response = self.http.post(url).json(request).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Ok(ServiceReply::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Ok(ServiceReply::Failed {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        Ok(ServiceReply::Success(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn success_with_text(text: &str) -> GenerateResponse {
        GenerateResponse {
            candidates: vec![Candidate {
                content: Some(Content {
                    parts: vec![Part {
                        text: text.to_string(),
                    }],
                }),
            }],
        }
    }

    fn run_retry(
        retries: usize,
        mut replies: VecDeque<ServiceReply>,
    ) -> (Result<GenerateResponse, EnrichError>, usize) {
        let mut calls = 0;
        let result = tokio_test::block_on(request_with_retry(
            retries,
            Duration::ZERO,
            || {
                calls += 1;
                let reply = replies.pop_front().expect("ran out of scripted replies");
                async move { Ok(reply) }
            },
        ));
        (result, calls)
    }

    #[test]
    fn test_retry_once_then_success() {
        let replies = VecDeque::from([
            ServiceReply::RateLimited,
            ServiceReply::Success(success_with_text("narrative")),
        ]);
        let (result, calls) = run_retry(3, replies);

        assert_eq!(calls, 2);
        assert_eq!(extract_text(&result.unwrap()).unwrap(), "narrative");
    }

    #[test]
    fn test_three_throttles_then_success() {
        let replies = VecDeque::from([
            ServiceReply::RateLimited,
            ServiceReply::RateLimited,
            ServiceReply::RateLimited,
            ServiceReply::Success(success_with_text("done")),
        ]);
        let (result, calls) = run_retry(3, replies);

        assert_eq!(calls, 4);
        assert!(result.is_ok());
    }

    #[test]
    fn test_throttle_cap_is_terminal() {
        let replies = VecDeque::from([
            ServiceReply::RateLimited,
            ServiceReply::RateLimited,
            ServiceReply::RateLimited,
        ]);
        let (result, calls) = run_retry(2, replies);

        assert_eq!(calls, 3);
        assert!(matches!(
            result,
            Err(EnrichError::ThrottleExhausted { attempts: 3 })
        ));
    }

    #[test]
    fn test_non_throttle_failure_is_immediate() {
        let replies = VecDeque::from([ServiceReply::Failed {
            status: 500,
            body: "boom".to_string(),
        }]);
        let (result, calls) = run_retry(3, replies);

        assert_eq!(calls, 1);
        assert!(matches!(
            result,
            Err(EnrichError::Service { status: 500, .. })
        ));
    }

    #[test]
    fn test_extract_text_no_candidates() {
        let response = GenerateResponse { candidates: vec![] };
        assert!(extract_text(&response).is_none());
    }

    #[test]
    fn test_extract_text_empty_parts() {
        let response = GenerateResponse {
            candidates: vec![Candidate {
                content: Some(Content { parts: vec![] }),
            }],
        };
        assert!(extract_text(&response).is_none());
    }

    #[test]
    fn test_parse_response_json() {
        let body = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "The most frequent response was A."}]}}
            ]
        }"#;
        let response: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            extract_text(&response).unwrap(),
            "The most frequent response was A."
        );
    }

    #[test]
    fn test_parse_content_without_parts_is_empty() {
        // A 200 response whose candidate content has no parts must not be a
        // deserialization error; it falls through to the sentinel.
        let response: GenerateResponse =
            serde_json::from_str(r#"{"candidates": [{"content": {}}]}"#).unwrap();
        assert!(extract_text(&response).is_none());
    }

    #[test]
    fn test_parse_part_without_text_is_empty() {
        let response: GenerateResponse =
            serde_json::from_str(r#"{"candidates": [{"content": {"parts": [{}]}}]}"#).unwrap();
        assert!(extract_text(&response).is_none());
    }

    #[test]
    fn test_parse_unexpected_shape_is_empty() {
        let response: GenerateResponse = serde_json::from_str(r#"{"other": 1}"#).unwrap();
        assert!(extract_text(&response).is_none());
    }

    #[test]
    fn test_request_payload_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "prompt".to_string(),
                }],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "prompt");
    }

    #[test]
    fn test_endpoint_format() {
        let config = ModelConfig {
            api_base: "https://example.test/".to_string(),
            name: "gemini-1.5-flash".to_string(),
            ..ModelConfig::default()
        };
        let client = GeminiClient::new(&config, "k".to_string()).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent?key=k"
        );
    }
}
