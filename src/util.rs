use std::str::FromStr;

use anyhow::Result;
use shakmaty::{
    CastlingMode, Chess, EnPassantMode, Position, Role,
    fen::Fen,
    uci::UciMove,
};

pub fn parse_uci_move(move_str: &str) -> Result<UciMove> {
    let uci_move = UciMove::from_str(move_str.trim())?;

    Ok(uci_move)
}

/// all legal moves of `game` in coordinate encoding
pub fn legal_uci_moves(game: &Chess) -> Vec<UciMove> {
    game.legal_moves()
        .iter()
        .map(|m| m.to_uci(CastlingMode::Standard))
        .collect()
}

pub fn to_fen(game: &Chess) -> String {
    Fen::from_position(game, EnPassantMode::Legal).to_string()
}

/// FEN without the move counters: equal keys mean a repeated position
pub fn position_key(game: &Chess) -> String {
    let fen = to_fen(game);
    fen.split(' ').take(4).collect::<Vec<_>>().join(" ")
}

pub fn from_fen(fen: &str) -> Result<Chess> {
    let setup = Fen::from_str(fen.trim())?;
    let game: Chess = setup.into_position(CastlingMode::Standard)?;
    Ok(game)
}

/// Resolves a coordinate move on `game`. A bare pawn move onto the last rank is
/// read as a queen promotion.
pub fn resolve_move(game: &Chess, uci_move: &UciMove) -> Option<shakmaty::Move> {
    if let Ok(m) = uci_move.to_move(game) {
        return Some(m);
    }
    match *uci_move {
        UciMove::Normal {
            from,
            to,
            promotion: None,
        } => UciMove::Normal {
            from,
            to,
            promotion: Some(Role::Queen),
        }
        .to_move(game)
        .ok(),
        _ => None,
    }
}
