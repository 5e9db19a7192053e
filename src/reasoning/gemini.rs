use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{ReasoningTransport, TransportError};
use crate::credentials::Credential;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// `generateContent` over HTTPS, one key per request.
pub struct GeminiTransport {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

impl GeminiTransport {
    pub fn new(endpoint: &str, model: &str) -> reqwest::Result<GeminiTransport> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(GeminiTransport {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }
}

#[async_trait]
impl ReasoningTransport for GeminiTransport {
    async fn generate(&self, credential: &Credential, prompt: &str) -> Result<String, TransportError> {
        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", credential.secret())
            .json(&GenerateRequest::new(prompt))
            .send()
            .await
            .map_err(|e| TransportError::Other(e.to_string()))?;

        let status = response.status();
        if let Some(e) = classify_status(status) {
            let body = response.text().await.unwrap_or_default();
            debug!("remote service answered {status}: {body}");
            return Err(e);
        }

        let reply: GenerateResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Other(format!("undecodable response body: {e}")))?;

        Ok(reply.text())
    }
}

fn classify_status(status: StatusCode) -> Option<TransportError> {
    match status {
        StatusCode::TOO_MANY_REQUESTS => Some(TransportError::RateLimited),
        StatusCode::SERVICE_UNAVAILABLE => Some(TransportError::Overloaded),
        s if s.is_success() => None,
        s => Some(TransportError::Other(format!("HTTP {s}"))),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [TextPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: [Content {
                parts: [TextPart { text: prompt }],
            }],
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ReplyContent>,
}

#[derive(Debug, Deserialize)]
struct ReplyContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Deserialize)]
struct ReplyPart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// text of the first candidate; empty when the service withheld it
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}
