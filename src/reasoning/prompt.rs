//! Prompt construction and reply sanitizing for the remote reasoning service.

use shakmaty::uci::UciMove;

use super::{ReasoningError, RemoteReply};

pub fn build(fen: &str, legal_moves: &[UciMove]) -> String {
    let side = match fen.split_whitespace().nth(1) {
        Some("w") => "White",
        _ => "Black",
    };
    let moves: Vec<String> = legal_moves.iter().map(|m| m.to_string()).collect();
    let moves = serde_json::to_string(&moves).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"You are a grandmaster chess engine playing {side}.
Current board state (FEN): "{fen}"
Valid moves: {moves}

Analyze the position deeply. Identify threats, hanging pieces and tactical opportunities.
Return ONLY a strictly valid JSON object. Do NOT use markdown code blocks.
Format:
{{
  "move": "e2e4",
  "thought": "Brief strategic reasoning",
  "taunt": "A short, witty taunt"
}}
Key requirement: the "move" MUST be in UCI format (e.g. e7e5, g8f6) and MUST be one of the valid moves provided."#
    )
}

/// Pulls the JSON object out of a reply that may be wrapped in prose or code
/// fences and decodes it.
pub fn parse_reply(text: &str) -> Result<RemoteReply, ReasoningError> {
    if text.trim().is_empty() {
        return Err(ReasoningError::Malformed("empty reply".to_string()));
    }

    let candidate = extract_object(text);
    serde_json::from_str(&candidate).map_err(|e| ReasoningError::Malformed(e.to_string()))
}

fn extract_object(text: &str) -> String {
    match (text.find('{'), text.rfind('}')) {
        (Some(open), Some(close)) if open < close => text[open..=close].to_string(),
        _ => text
            .replace("```json", "")
            .replace("```", "")
            .trim()
            .to_string(),
    }
}
