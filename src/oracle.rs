use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use log::{info, warn};
use serde::Serialize;
use shakmaty::uci::UciMove;
use thiserror::Error;
use tokio::sync::watch;

use crate::{
    book::OpeningBook,
    breaker::Breaker,
    commentary::{self, OPENING_REMARK},
    engine::{EngineError, SearchEngine},
    reasoning::{ReasoningClient, ReasoningError},
};

const FALLBACK_SUFFIX: &str = " (fallback mode)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveSource {
    Book,
    Remote,
    Engine,
}

impl fmt::Display for MoveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MoveSource::Book => "book",
            MoveSource::Remote => "remote",
            MoveSource::Engine => "engine",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Idle,
    Thinking,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveResult {
    pub mv: UciMove,
    pub commentary: String,
    pub thought: String,
    pub source: MoveSource,
    /// set only on the call that switched the remote stage off
    pub notice: Option<String>,
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("local engine failed: {0}")]
    Engine(#[from] EngineError),
    #[error("no move within {0:?}")]
    TurnTimeout(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleSettings {
    /// artificial pause after a book hit
    pub book_delay: Duration,
    /// covers the remote and engine stages together; None waits forever
    pub turn_timeout: Option<Duration>,
    /// whether an unparsable remote reply switches the remote stage off
    pub trip_on_malformed: bool,
}

impl Default for OracleSettings {
    fn default() -> Self {
        OracleSettings {
            book_delay: Duration::from_millis(800),
            turn_timeout: Some(Duration::from_secs(120)),
            trip_on_malformed: true,
        }
    }
}

/// Marks the oracle busy for as long as it is alive.
struct ThinkingGuard(Arc<watch::Sender<Status>>);

impl ThinkingGuard {
    fn enter(status: &Arc<watch::Sender<Status>>) -> ThinkingGuard {
        status.send_replace(Status::Thinking);
        ThinkingGuard(Arc::clone(status))
    }
}

impl Drop for ThinkingGuard {
    fn drop(&mut self) {
        self.0.send_replace(Status::Idle);
    }
}

/// Picks moves for one game session: book first, then the remote reasoning
/// service until it fails once, then the local engine.
pub struct Oracle {
    book: OpeningBook,
    reasoning: ReasoningClient,
    engine: Box<dyn SearchEngine>,
    breaker: Breaker,
    status: Arc<watch::Sender<Status>>,
    settings: OracleSettings,
}

impl Oracle {
    pub fn new(
        book: OpeningBook,
        reasoning: ReasoningClient,
        engine: Box<dyn SearchEngine>,
        settings: OracleSettings,
    ) -> Oracle {
        let (status, _) = watch::channel(Status::Idle);
        Oracle {
            book,
            reasoning,
            engine,
            breaker: Breaker::new(),
            status: Arc::new(status),
            settings,
        }
    }

    pub fn status(&self) -> Status {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<Status> {
        self.status.subscribe()
    }

    pub fn remote_disabled(&self) -> bool {
        self.breaker.is_tripped()
    }

    pub fn subscribe_remote_disabled(&self) -> watch::Receiver<bool> {
        self.breaker.subscribe()
    }

    /// Chooses a move for `fen`. Only a local engine failure (or the turn
    /// timeout) is an error; book misses and remote failures fall through.
    pub async fn pick_move(
        &mut self,
        fen: &str,
        legal_moves: &[UciMove],
    ) -> Result<MoveResult, OracleError> {
        let _thinking = ThinkingGuard::enter(&self.status);

        if let Some(mv) = self.book.lookup(fen) {
            info!("book move {mv}");
            tokio::time::sleep(self.settings.book_delay).await;
            return Ok(MoveResult {
                mv,
                commentary: OPENING_REMARK.to_string(),
                thought: "Opening book move".to_string(),
                source: MoveSource::Book,
                notice: None,
            });
        }

        match self.settings.turn_timeout {
            Some(limit) => tokio::time::timeout(limit, self.consult(fen, legal_moves))
                .await
                .map_err(|_| OracleError::TurnTimeout(limit))?,
            None => self.consult(fen, legal_moves).await,
        }
    }

    async fn consult(
        &mut self,
        fen: &str,
        legal_moves: &[UciMove],
    ) -> Result<MoveResult, OracleError> {
        let mut notice = None;

        if !self.breaker.is_tripped() {
            match self.ask_remote(fen, legal_moves).await {
                Ok(result) => return Ok(result),
                Err(failure) => {
                    warn!("remote reasoning failed, falling back to the engine: {failure}");
                    let trips = failure.trips_breaker(&self.settings);
                    if trips && self.breaker.trip(&failure.to_string()) {
                        notice = Some(commentary::switch_notice());
                    }
                }
            }
        }

        let mv = self.engine.search(fen).await?;
        info!("engine move {mv}");

        let mut remark = commentary::describe(fen, &mv);
        if self.breaker.is_tripped() {
            remark.push_str(FALLBACK_SUFFIX);
        }

        Ok(MoveResult {
            mv,
            commentary: remark,
            thought: format!("Engine calculation (depth {})", self.engine.depth()),
            source: MoveSource::Engine,
            notice,
        })
    }

    async fn ask_remote(
        &mut self,
        fen: &str,
        legal_moves: &[UciMove],
    ) -> Result<MoveResult, RemoteFailure> {
        let reply = self
            .reasoning
            .request(&self.breaker, fen, legal_moves)
            .await
            .map_err(RemoteFailure::Reasoning)?;

        let mv = UciMove::from_str(reply.mv.trim())
            .ok()
            .filter(|m| legal_moves.contains(m))
            .ok_or_else(|| RemoteFailure::IllegalMove(reply.mv.clone()))?;
        info!("remote move {mv}");

        let thought = reply
            .thought
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "Analyzing...".to_string());
        let commentary = reply
            .taunt
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| thought.clone());

        Ok(MoveResult {
            mv,
            commentary,
            thought,
            source: MoveSource::Remote,
            notice: None,
        })
    }
}

#[derive(Debug, Error)]
enum RemoteFailure {
    #[error(transparent)]
    Reasoning(ReasoningError),
    #[error("remote suggested a move outside the legal set: {0:?}")]
    IllegalMove(String),
}

impl RemoteFailure {
    fn trips_breaker(&self, settings: &OracleSettings) -> bool {
        match self {
            RemoteFailure::Reasoning(ReasoningError::Malformed(_)) => settings.trip_on_malformed,
            _ => true,
        }
    }
}
