use log::debug;
use rand::{Rng, seq::IndexedRandom};
use shakmaty::{Position, uci::UciMove};

use crate::util::{from_fen, resolve_move};

pub const CHECKMATE_REMARK: &str = "Checkmate! Game over!";
pub const INVALID_MOVE_REMARK: &str = "That move makes no sense on this board!";
pub const OPENING_REMARK: &str = "A textbook opening, well played!";

const CHECK_PHRASES: &[&str] = &[
    "Check! Where is your king running off to?",
    "Your king is in trouble, better deal with it.",
    "No escape for you. Check!",
    "Mind your king's head!",
];

const CAPTURE_PHRASES: &[&str] = &[
    "Yum, I'll take that piece.",
    "Thanks for the gift!",
    "That trade went my way.",
    "An expensive slip. That one is mine now.",
];

const QUIET_PHRASES: &[&str] = &[
    "How long did you spend on that one?",
    "Let's see how you handle this.",
    "Running out of ideas already?",
    "Not bad, but not quite good enough.",
    "Interesting move, but I saw it coming.",
    "Careful now, there might be a trap here.",
];

const SWITCH_PHRASES: &[&str] = &[
    "The network is acting up, switching to the engine. Good luck!",
    "My remote brain went on holiday. Now you face the engine!",
    "Out of API quota. Time for some cold, hard calculation.",
];

/// Result of replaying a move on a scratch copy of the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    Checkmate,
    Check,
    Capture,
    Quiet,
    Invalid,
}

pub fn classify(fen: &str, uci_move: &UciMove) -> MoveKind {
    let Ok(mut scratch) = from_fen(fen) else {
        return MoveKind::Invalid;
    };
    let Some(m) = resolve_move(&scratch, uci_move) else {
        return MoveKind::Invalid;
    };

    let captured = m.is_capture();
    scratch.play_unchecked(m);

    if scratch.is_checkmate() {
        MoveKind::Checkmate
    } else if scratch.is_check() {
        MoveKind::Check
    } else if captured {
        MoveKind::Capture
    } else {
        MoveKind::Quiet
    }
}

pub fn describe(fen: &str, uci_move: &UciMove) -> String {
    describe_with(fen, uci_move, &mut rand::rng())
}

pub fn describe_with<R: Rng + ?Sized>(fen: &str, uci_move: &UciMove, rng: &mut R) -> String {
    let kind = classify(fen, uci_move);
    debug!("{uci_move} classified as {kind:?}");

    match kind {
        MoveKind::Checkmate => CHECKMATE_REMARK.to_string(),
        MoveKind::Invalid => INVALID_MOVE_REMARK.to_string(),
        MoveKind::Check => pick(CHECK_PHRASES, rng),
        MoveKind::Capture => pick(CAPTURE_PHRASES, rng),
        MoveKind::Quiet => pick(QUIET_PHRASES, rng),
    }
}

/// Announcement for the turn the remote stage gets switched off.
pub fn switch_notice() -> String {
    pick(SWITCH_PHRASES, &mut rand::rng())
}

fn pick<R: Rng + ?Sized>(phrases: &[&str], rng: &mut R) -> String {
    phrases.choose(rng).copied().unwrap_or("...").to_string()
}
