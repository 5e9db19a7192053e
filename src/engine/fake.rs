use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    time::Instant,
};

use super::EngineBridge;

/// In-memory UCI engine speaking over a duplex pipe.
#[derive(Clone, Default)]
pub(crate) struct FakeEngine {
    answers: HashMap<String, String>,
    think: Duration,
    until_stopped: HashSet<String>,
    stray: Option<String>,
    stop_lag: Option<Duration>,
    hang_up_on_go: bool,
    received: Arc<Mutex<Vec<String>>>,
}

impl FakeEngine {
    pub(crate) fn new() -> FakeEngine {
        FakeEngine::default()
    }

    pub(crate) fn answer(mut self, fen: &str, best: &str) -> FakeEngine {
        self.answers.insert(fen.to_string(), best.to_string());
        self
    }

    pub(crate) fn think_for(mut self, think: Duration) -> FakeEngine {
        self.think = think;
        self
    }

    /// searches on `fen` only answer once `stop` arrives
    pub(crate) fn think_until_stopped(mut self, fen: &str) -> FakeEngine {
        self.until_stopped.insert(fen.to_string());
        self
    }

    /// emits a leftover `bestmove` right after every `position` command
    pub(crate) fn stray_reply_on_position(mut self, best: &str) -> FakeEngine {
        self.stray = Some(best.to_string());
        self
    }

    /// answers `stop` late: after the next `readyok`, or after `lag` at the latest
    pub(crate) fn stop_lag(mut self, lag: Duration) -> FakeEngine {
        self.stop_lag = Some(lag);
        self
    }

    pub(crate) fn hang_up_on_go(mut self) -> FakeEngine {
        self.hang_up_on_go = true;
        self
    }

    pub(crate) fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    pub(crate) fn bridge(&self) -> EngineBridge {
        let (bridge_side, engine_side) = tokio::io::duplex(4096);
        let (bridge_read, bridge_write) = tokio::io::split(bridge_side);
        tokio::spawn(self.clone().run(engine_side));
        EngineBridge::from_io(bridge_write, bridge_read, super::SEARCH_DEPTH)
    }

    async fn run(self, io: tokio::io::DuplexStream) {
        let (read, mut write) = tokio::io::split(io);
        let mut lines = BufReader::new(read).lines();
        let mut fen = String::new();
        let mut waiting: Option<String> = None;
        let mut late: Option<(String, Instant)> = None;

        loop {
            let due = late.as_ref().map(|(_, at)| *at);
            let line = tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => line,
                    _ => return,
                },
                _ = tokio::time::sleep_until(due.unwrap_or_else(Instant::now)),
                    if due.is_some() =>
                {
                    if let Some((reply, _)) = late.take() {
                        if write.write_all(format!("{reply}\n").as_bytes()).await.is_err() {
                            return;
                        }
                    }
                    continue;
                }
            };
            self.received.lock().unwrap().push(line.clone());

            let replies = match line.as_str() {
                "uci" => vec!["id name Fake".to_string(), "uciok".to_string()],
                "isready" => std::iter::once("readyok".to_string())
                    .chain(late.take().map(|(reply, _)| reply))
                    .collect(),
                "stop" => match (waiting.take(), self.stop_lag) {
                    (Some(f), Some(lag)) => {
                        late = Some((self.best_move(&f), Instant::now() + lag));
                        Vec::new()
                    }
                    (Some(f), None) => vec![self.best_move(&f)],
                    (None, _) => Vec::new(),
                },
                l if l.starts_with("position fen ") => {
                    fen = l["position fen ".len()..].to_string();
                    self.stray.iter().map(|m| format!("bestmove {m}")).collect()
                }
                l if l.starts_with("go") => {
                    if self.hang_up_on_go {
                        return;
                    }
                    if self.until_stopped.contains(&fen) {
                        waiting = Some(fen.clone());
                        Vec::new()
                    } else {
                        if !self.think.is_zero() {
                            tokio::time::sleep(self.think).await;
                        }
                        vec![
                            "info depth 1 score cp 20".to_string(),
                            self.best_move(&fen),
                        ]
                    }
                }
                _ => Vec::new(),
            };

            for reply in replies {
                if write.write_all(format!("{reply}\n").as_bytes()).await.is_err() {
                    return;
                }
            }
        }
    }

    fn best_move(&self, fen: &str) -> String {
        let best = self.answers.get(fen).map_or("(none)", String::as_str);
        format!("bestmove {best}")
    }
}
