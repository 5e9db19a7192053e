use std::{collections::HashMap, str::FromStr};

use log::warn;
use shakmaty::uci::UciMove;

/// Exact-match opening table. Keys are full FEN strings; any other encoding of
/// the same position (different counters, transposed move order) is a miss.
const STANDARD_LINES: &[(&str, &str)] = &[
    // starting position
    ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", "e2e4"),
    // 1. e4
    ("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1", "e7e5"),
    // 1. d4
    ("rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq - 0 1", "d7d5"),
    // 1. e4 e5
    ("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2", "g1f3"),
    // 1. e4 e5 2. Nf3
    ("rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2", "b8c6"),
    // 1. e4 e5 2. Nf3 Nc6 -> Ruy Lopez
    ("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3", "f1b5"),
    // Ruy Lopez, Morphy defence
    ("r1bqkbnr/pppp1ppp/2n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3", "a7a6"),
    // Sicilian: 1. e4 c5
    ("rnbqkbnr/pp1ppppp/8/2p5/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2", "g1f3"),
];

#[derive(Debug, Clone, Default)]
pub struct OpeningBook {
    lines: HashMap<String, UciMove>,
}

impl OpeningBook {
    pub fn standard() -> OpeningBook {
        OpeningBook::from_entries(STANDARD_LINES.iter().copied())
    }

    /// entries with an unparsable move are skipped
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> OpeningBook {
        let lines = entries
            .into_iter()
            .filter_map(|(fen, uci)| match UciMove::from_str(uci) {
                Ok(m) => Some((fen.to_string(), m)),
                Err(e) => {
                    warn!("skipping book entry {fen:?} -> {uci:?}: {e}");
                    None
                }
            })
            .collect();

        OpeningBook { lines }
    }

    pub fn lookup(&self, fen: &str) -> Option<UciMove> {
        self.lines.get(fen).cloned()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
