//! The subset of the UCI line protocol the bridge speaks.

use std::{fmt, str::FromStr};

use shakmaty::uci::UciMove;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Uci,
    IsReady,
    UciNewGame,
    Position { fen: &'a str },
    Go { depth: u8 },
    Stop,
    Quit,
}

impl fmt::Display for Command<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Uci => write!(f, "uci"),
            Command::IsReady => write!(f, "isready"),
            Command::UciNewGame => write!(f, "ucinewgame"),
            Command::Position { fen } => write!(f, "position fen {fen}"),
            Command::Go { depth } => write!(f, "go depth {depth}"),
            Command::Stop => write!(f, "stop"),
            Command::Quit => write!(f, "quit"),
        }
    }
}

/// One line of engine output, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineMessage {
    UciOk,
    ReadyOk,
    /// `best` is None for `bestmove (none)`
    BestMove {
        best: Option<UciMove>,
        ponder: Option<UciMove>,
    },
    Info(String),
    Id(String),
    /// a recognised tag whose payload did not parse
    Malformed(String),
    Other(String),
}

impl EngineMessage {
    pub fn parse(line: &str) -> EngineMessage {
        let line = line.trim();
        let mut tokens = line.split_whitespace();

        match tokens.next() {
            Some("uciok") => EngineMessage::UciOk,
            Some("readyok") => EngineMessage::ReadyOk,
            Some("info") => EngineMessage::Info(line.to_string()),
            Some("id") => EngineMessage::Id(line.to_string()),
            Some("bestmove") => {
                let best = match tokens.next() {
                    None => return EngineMessage::Malformed(line.to_string()),
                    Some("(none)") | Some("0000") => None,
                    Some(token) => match UciMove::from_str(token) {
                        Ok(m) => Some(m),
                        Err(_) => return EngineMessage::Malformed(line.to_string()),
                    },
                };
                let ponder = match (tokens.next(), tokens.next()) {
                    (Some("ponder"), Some(token)) => UciMove::from_str(token).ok(),
                    _ => None,
                };
                EngineMessage::BestMove { best, ponder }
            }
            _ => EngineMessage::Other(line.to_string()),
        }
    }
}
