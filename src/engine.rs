pub mod uci;
#[cfg(test)]
mod fake;

use std::{process::Stdio, sync::Arc};

use async_trait::async_trait;
use log::{debug, info, trace, warn};
use shakmaty::uci::UciMove;
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    process::{Child, Command as ProcessCommand},
    sync::{Mutex, mpsc},
};
use uci::{Command, EngineMessage};

pub const SEARCH_DEPTH: u8 = 10;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("engine channel closed")]
    Closed,
    #[error("engine protocol error: {0}")]
    Protocol(String),
}

#[async_trait]
pub trait SearchEngine: Send + Sync {
    async fn search(&self, fen: &str) -> Result<UciMove, EngineError>;

    /// nominal search depth, reported in move rationales
    fn depth(&self) -> u8;
}

#[async_trait]
impl<T: SearchEngine + ?Sized> SearchEngine for Arc<T> {
    async fn search(&self, fen: &str) -> Result<UciMove, EngineError> {
        (**self).search(fen).await
    }

    fn depth(&self) -> u8 {
        (**self).depth()
    }
}

/// A search that was sent `go` but whose `bestmove` has not been read yet.
#[derive(Debug)]
struct PendingSearch {
    id: u64,
    fen: String,
    stop_sent: bool,
}

struct Channel {
    writer: Box<dyn AsyncWrite + Send + Unpin>,
    replies: mpsc::Receiver<EngineMessage>,
    pending: Option<PendingSearch>,
    searches: u64,
    _child: Option<Child>,
}

impl Channel {
    async fn send(&mut self, command: Command<'_>) -> Result<(), EngineError> {
        trace!(">> {command}");
        self.writer
            .write_all(format!("{command}\n").as_bytes())
            .await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn next(&mut self) -> Result<EngineMessage, EngineError> {
        self.replies.recv().await.ok_or(EngineError::Closed)
    }

    /// Reads until `expected` arrives. A `bestmove` seen on the way belongs to
    /// an earlier search and is dropped.
    async fn wait_for(&mut self, expected: EngineMessage) -> Result<(), EngineError> {
        loop {
            match self.next().await? {
                msg if msg == expected => return Ok(()),
                EngineMessage::BestMove { best, .. } => {
                    warn!("discarding stale engine reply: bestmove {best:?}")
                }
                msg => trace!("<< {msg:?}"),
            }
        }
    }

    async fn wait_for_best_move(&mut self) -> Result<Option<UciMove>, EngineError> {
        loop {
            match self.next().await? {
                EngineMessage::BestMove { best, .. } => return Ok(best),
                EngineMessage::Malformed(line) => return Err(EngineError::Protocol(line)),
                msg => trace!("<< {msg:?}"),
            }
        }
    }
}

/// Single-slot pipeline to an external UCI engine. Concurrent callers queue on
/// the channel lock in arrival order, so every reply lands with its own search.
pub struct EngineBridge {
    channel: Mutex<Channel>,
    depth: u8,
}

impl EngineBridge {
    /// Starts the engine executable and runs the UCI handshake.
    pub async fn spawn(path: &str, depth: u8) -> Result<EngineBridge, EngineError> {
        let mut child = ProcessCommand::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        let stdin = child.stdin.take().ok_or(EngineError::Closed)?;
        let stdout = child.stdout.take().ok_or(EngineError::Closed)?;

        let bridge = EngineBridge::connect(stdin, stdout, depth, Some(child));
        bridge.handshake().await?;
        info!("engine {path} ready (search depth {depth})");
        Ok(bridge)
    }

    /// Wraps an already-connected engine. Must be called inside a tokio runtime.
    pub fn from_io<W, R>(writer: W, reader: R, depth: u8) -> EngineBridge
    where
        W: AsyncWrite + Send + Unpin + 'static,
        R: AsyncRead + Send + Unpin + 'static,
    {
        EngineBridge::connect(writer, reader, depth, None)
    }

    fn connect<W, R>(writer: W, reader: R, depth: u8, child: Option<Child>) -> EngineBridge
    where
        W: AsyncWrite + Send + Unpin + 'static,
        R: AsyncRead + Send + Unpin + 'static,
    {
        let (tx, replies) = mpsc::channel(256);
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if tx.send(EngineMessage::parse(&line)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("reading engine output failed: {e}");
                        break;
                    }
                }
            }
            debug!("engine output closed");
        });

        EngineBridge {
            channel: Mutex::new(Channel {
                writer: Box::new(writer),
                replies,
                pending: None,
                searches: 0,
                _child: child,
            }),
            depth,
        }
    }

    pub async fn handshake(&self) -> Result<(), EngineError> {
        let mut channel = self.channel.lock().await;
        channel.send(Command::Uci).await?;
        channel.wait_for(EngineMessage::UciOk).await?;
        channel.send(Command::IsReady).await?;
        channel.wait_for(EngineMessage::ReadyOk).await?;
        channel.send(Command::UciNewGame).await
    }

    pub async fn shutdown(&self) {
        let mut channel = self.channel.lock().await;
        if let Err(e) = channel.send(Command::Quit).await {
            debug!("engine already gone: {e}");
        }
    }
}

#[async_trait]
impl SearchEngine for EngineBridge {
    async fn search(&self, fen: &str) -> Result<UciMove, EngineError> {
        let mut channel = self.channel.lock().await;

        // a caller that gave up mid-search leaves its bestmove in flight; the
        // record stays until that reply is read, even if this caller gives up too
        if let Some(stale) = channel.pending.as_mut() {
            warn!(
                "search #{} ({}) was abandoned, draining it first",
                stale.id, stale.fen
            );
            let needs_stop = !std::mem::replace(&mut stale.stop_sent, true);
            if needs_stop {
                channel.send(Command::Stop).await?;
            }
            channel.wait_for_best_move().await?;
            channel.pending = None;
        }

        channel.send(Command::Position { fen }).await?;
        channel.send(Command::IsReady).await?;
        channel.wait_for(EngineMessage::ReadyOk).await?;

        channel.searches += 1;
        let id = channel.searches;
        channel.send(Command::Go { depth: self.depth }).await?;
        channel.pending = Some(PendingSearch {
            id,
            fen: fen.to_string(),
            stop_sent: false,
        });

        let best = channel.wait_for_best_move().await?;
        channel.pending = None;

        let best = best.ok_or_else(|| {
            EngineError::Protocol(format!("engine has no move in position {fen}"))
        })?;
        debug!("search #{id} -> {best}");
        Ok(best)
    }

    fn depth(&self) -> u8 {
        self.depth
    }
}
