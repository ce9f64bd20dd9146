use anyhow::Result;
use clap::Parser;
use cozy_chess::{Color, Piece};
use hybridchess::{GameSession, Position, SessionConfig, SessionError};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Play chess against the hybrid engine/network AI", long_about = None)]
struct Args {
    /// Path to the UCI engine binary
    #[arg(long, default_value = "stockfish")]
    engine: String,

    /// Path to the policy network checkpoint
    #[arg(long, default_value = "models/checkpoints/ml.net")]
    model: PathBuf,

    /// Engine skill level (0-20)
    #[arg(long, default_value_t = 12)]
    skill: u8,

    /// Your color: 'w' for white, 'b' for black
    #[arg(long, default_value = "w")]
    color: String,

    /// Starting FEN position
    #[arg(long)]
    fen: Option<String>,

    /// Print move reports as JSON
    #[arg(long)]
    json: bool,
}

fn parse_color(color_str: &str) -> Result<Color> {
    match color_str.to_lowercase().as_str() {
        "w" | "white" => Ok(Color::White),
        "b" | "black" => Ok(Color::Black),
        _ => anyhow::bail!("Invalid color: use 'w' or 'b'"),
    }
}

fn print_board(pos: &Position) {
    let board = pos.board();
    let mut grid = [['.'; 8]; 8];
    for sq in board.occupied() {
        if let Some((piece, color)) = board.piece_on(sq).zip(board.color_on(sq)) {
            let c = match piece {
                Piece::Pawn => 'p',
                Piece::Knight => 'n',
                Piece::Bishop => 'b',
                Piece::Rook => 'r',
                Piece::Queen => 'q',
                Piece::King => 'k',
            };
            let c = if color == Color::White { c.to_ascii_uppercase() } else { c };
            grid[sq.rank() as usize][sq.file() as usize] = c;
        }
    }
    println!();
    for rank in (0..8).rev() {
        print!("{} ", rank + 1);
        for file in 0..8 {
            print!(" {}", grid[rank][file]);
        }
        println!();
    }
    println!("   a b c d e f g h");
}

fn read_move_line() -> Result<String> {
    print!("Your move (e.g. e2e4; 'undo', 'quit'): ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let human = parse_color(&args.color)?;

    let config = SessionConfig {
        engine_path: args.engine.clone(),
        model_path: args.model.clone(),
        skill: args.skill,
    };
    let mut session = GameSession::connect(config)?;
    if let Some(fen) = &args.fen {
        session.set_position(Position::from_fen(fen)?);
    }

    loop {
        print_board(session.position());
        if session.is_game_over() {
            println!("Game over: {}", session.fen());
            break;
        }

        if session.position().side_to_move() == human {
            let input = read_move_line()?;
            match input.as_str() {
                "quit" => break,
                "undo" => {
                    let n = session.undo_pair();
                    println!("took back {n} plies");
                    continue;
                }
                "redo" => {
                    let n = session.redo_pair();
                    println!("replayed {n} plies");
                    continue;
                }
                _ => {}
            }
            match session.play_exchange(&input) {
                Ok(report) => {
                    if args.json {
                        println!("{}", serde_json::to_string(&report)?);
                    } else {
                        if let Some(ai) = &report.ai_move {
                            println!("AI plays {ai}");
                        }
                        println!(
                            "eval {:+.2} pawns, your move was {:?}{}",
                            report.evaluation,
                            report.judgement,
                            if report.captured { " (capture)" } else { "" }
                        );
                    }
                }
                Err(SessionError::IllegalMove { uci }) => println!("Illegal move: {uci}"),
                Err(e) => return Err(e.into()),
            }
        } else {
            // AI has the first move when the human plays black
            match session.select_ai_move()? {
                Some(mv) => {
                    let uci = session.position().uci(mv);
                    session.push(mv)?;
                    println!("AI plays {uci}");
                }
                None => {
                    println!("AI has no move");
                    break;
                }
            }
        }
    }
    Ok(())
}
