use std::{collections::HashMap, io::Write, sync::Arc};

use anyhow::{Context, Result, bail};
use chess_oracle::{
    Oracle,
    book::OpeningBook,
    config::Config,
    credentials::CredentialPool,
    engine::EngineBridge,
    logging,
    reasoning::{GeminiTransport, ReasoningClient},
    util::{legal_uci_moves, parse_uci_move, position_key, resolve_move, to_fen},
};
use log::{info, warn};
use shakmaty::{Chess, Color, File, Move, Position, Rank, Square};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    logging::init(config.log_level)?;

    if config.api_keys.is_empty() {
        warn!("no API keys configured, every non-book move will come from the engine");
    } else {
        info!("{} API key(s) loaded", config.api_keys.len());
    }

    let engine = EngineBridge::spawn(&config.engine_path, config.engine_depth)
        .await
        .with_context(|| format!("starting engine {:?}", config.engine_path))?;
    let engine = Arc::new(engine);

    let transport = GeminiTransport::new(&config.endpoint, &config.model)?;
    let reasoning = ReasoningClient::new(
        Box::new(transport),
        CredentialPool::new(config.api_keys.clone()),
    )
    .with_policy(config.retry)
    .with_min_interval(config.min_interval);

    // one oracle per game: breaker and rate limit state live and die with it
    let mut oracle = Oracle::new(
        OpeningBook::standard(),
        reasoning,
        Box::new(engine.clone()),
        config.settings,
    );

    let outcome = play(&mut oracle, config.play_as).await;
    engine.shutdown().await;
    outcome
}

async fn play(oracle: &mut Oracle, oracle_color: Color) -> Result<()> {
    let mut game = Chess::default();
    let mut seen = HashMap::new();
    let mut repeats = record(&mut seen, &game);
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    println!("You play {}. Enter moves like e2e4, 'quit' to leave.", !oracle_color);

    loop {
        print_board(&game);
        if let Some(verdict) = verdict(&game, repeats) {
            println!("{verdict}");
            return Ok(());
        }

        if game.turn() == oracle_color {
            let fen = to_fen(&game);
            let result = oracle.pick_move(&fen, &legal_uci_moves(&game)).await?;

            let Some(chosen) = resolve_move(&game, &result.mv) else {
                bail!("oracle answered {} which is illegal in {fen}", result.mv);
            };
            announce_move(&game, &chosen);
            println!("  [{}] {}", result.source, result.commentary);
            info!("rationale: {}", result.thought);
            // the notice only comes with the turn that switched the remote stage off
            if let Some(notice) = result.notice {
                println!("  ** {notice}");
                println!("  ** remote reasoning is off for the rest of this game");
            }

            game.play_unchecked(chosen);
            repeats = record(&mut seen, &game);
            continue;
        }

        print!("your move> ");
        std::io::stdout().flush()?;
        let Some(line) = input.next_line().await? else {
            return Ok(());
        };
        let line = line.trim();
        if line == "quit" {
            return Ok(());
        }

        match parse_uci_move(line).ok().and_then(|m| resolve_move(&game, &m)) {
            Some(m) => {
                announce_move(&game, &m);
                game.play_unchecked(m);
                repeats = record(&mut seen, &game);
            }
            None => println!("{line:?} is not a legal move here"),
        }
    }
}

/// how often the current position has now occurred
fn record(seen: &mut HashMap<String, u32>, game: &Chess) -> u32 {
    let count = seen.entry(position_key(game)).or_insert(0);
    *count += 1;
    *count
}

fn verdict(game: &Chess, repeats: u32) -> Option<String> {
    if game.is_checkmate() {
        Some(format!("Checkmate, {} wins.", !game.turn()))
    } else if game.is_stalemate() {
        Some("Stalemate.".to_string())
    } else if game.is_insufficient_material() {
        Some("Draw by insufficient material.".to_string())
    } else if game.halfmoves() >= 100 {
        Some("Draw by the fifty-move rule.".to_string())
    } else if repeats >= 3 {
        Some("Draw by threefold repetition.".to_string())
    } else {
        None
    }
}

fn announce_move(game: &Chess, m: &Move) {
    println!(
        "{:>3}. {} played {:?} ({}) to {}{}",
        game.fullmoves(),
        game.turn().to_string().to_uppercase(),
        m.role(),
        m.from().map_or("-".to_string(), |sq| sq.to_string()),
        m.to(),
        m.capture()
            .map_or(String::new(), |role| format!(", taking {role:?}"))
    );
}

fn print_board(game: &Chess) {
    let board = game.board();
    for rank in Rank::ALL.iter().rev() {
        let row: String = File::ALL
            .iter()
            .map(|&file| {
                board
                    .piece_at(Square::from_coords(file, *rank))
                    .map_or('.', |p| p.char())
            })
            .flat_map(|c| [c, ' '])
            .collect();
        println!("{} {}", rank.char(), row.trim_end());
    }
    println!("  a b c d e f g h");
}
