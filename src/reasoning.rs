mod gemini;
pub mod prompt;
#[cfg(test)]
pub(crate) mod testing;

pub use gemini::GeminiTransport;

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Deserialize;
use shakmaty::uci::UciMove;
use thiserror::Error;
use tokio::time::{Instant, sleep};

use crate::{
    breaker::Breaker,
    credentials::{Credential, CredentialPool},
};

pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(4000);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("rate limited (HTTP 429)")]
    RateLimited,
    #[error("server overloaded (HTTP 503)")]
    Overloaded,
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// rate and overload signals are worth another attempt, nothing else is
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::RateLimited | TransportError::Overloaded)
    }
}

#[derive(Debug, Error)]
pub enum ReasoningError {
    #[error("remote reasoning is disabled for this session")]
    CircuitOpen,
    #[error("no API credentials configured")]
    NoCredentials,
    #[error("gave up after {attempts} attempts, last error: {last}")]
    TransientExhausted { attempts: u32, last: TransportError },
    #[error("malformed reply: {0}")]
    Malformed(String),
    #[error("transport error: {0}")]
    Transport(TransportError),
}

/// The reply the remote service is asked to produce.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteReply {
    #[serde(rename = "move")]
    pub mv: String,
    #[serde(default)]
    pub thought: Option<String>,
    #[serde(default)]
    pub taunt: Option<String>,
}

#[async_trait]
pub trait ReasoningTransport: Send + Sync {
    async fn generate(&self, credential: &Credential, prompt: &str)
    -> Result<String, TransportError>;
}

/// Backoff applied once credential rotation has nothing left to offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// delay before backoff retry number `retry` (zero based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(self.multiplier.saturating_pow(retry))
    }
}

pub struct ReasoningClient {
    transport: Box<dyn ReasoningTransport>,
    pool: CredentialPool,
    policy: RetryPolicy,
    min_interval: Duration,
    last_request_at: Option<Instant>,
}

impl ReasoningClient {
    pub fn new(transport: Box<dyn ReasoningTransport>, pool: CredentialPool) -> ReasoningClient {
        ReasoningClient {
            transport,
            pool,
            policy: RetryPolicy::default(),
            min_interval: MIN_REQUEST_INTERVAL,
            last_request_at: None,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> ReasoningClient {
        self.policy = policy;
        self
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> ReasoningClient {
        self.min_interval = min_interval;
        self
    }

    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    /// Asks the remote service for a move. The returned move is NOT checked
    /// against `legal_moves`; that is up to the caller.
    pub async fn request(
        &mut self,
        breaker: &Breaker,
        fen: &str,
        legal_moves: &[UciMove],
    ) -> Result<RemoteReply, ReasoningError> {
        if breaker.is_tripped() {
            return Err(ReasoningError::CircuitOpen);
        }
        if self.pool.is_empty() {
            return Err(ReasoningError::NoCredentials);
        }

        self.wait_for_slot().await;

        let prompt = prompt::build(fen, legal_moves);
        let text = self.dispatch(&prompt).await?;
        debug!("raw remote reply: {text}");

        prompt::parse_reply(&text)
    }

    async fn wait_for_slot(&mut self) {
        if let Some(last) = self.last_request_at {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                info!("rate limit: waiting {}ms before next request", wait.as_millis());
                sleep(wait).await;
            }
        }
        // stamped at dispatch, not at response
        self.last_request_at = Some(Instant::now());
    }

    /// Each credential gets one shot per request before falling back to backoff
    /// on whichever credential is current at that point.
    async fn dispatch(&mut self, prompt: &str) -> Result<String, ReasoningError> {
        let mut rotations_left = self.pool.len().saturating_sub(1);
        let mut retry = 0;
        let mut attempts = 0;

        loop {
            let credential = self
                .pool
                .current()
                .cloned()
                .ok_or(ReasoningError::NoCredentials)?;
            attempts += 1;

            let error = match self.transport.generate(&credential, prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() => e,
                Err(e) => return Err(ReasoningError::Transport(e)),
            };
            warn!("remote reasoning attempt {attempts} failed: {error}");

            if rotations_left > 0 && self.pool.rotate() {
                rotations_left -= 1;
                continue;
            }

            if retry < self.policy.max_retries {
                let delay = self.policy.delay_for(retry);
                warn!(
                    "retrying in {}ms ({} retries left)",
                    delay.as_millis(),
                    self.policy.max_retries - retry
                );
                retry += 1;
                sleep(delay).await;
                continue;
            }

            return Err(ReasoningError::TransientExhausted {
                attempts,
                last: error,
            });
        }
    }
}
