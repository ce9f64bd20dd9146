use anyhow::{bail, Context, Result};
use cozy_chess::Move;
use log::info;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::agents::{Agent, Evaluator};
use crate::board::Position;

/// Mate scores are clamped to +/- this many pawns.
pub const MATE_SCORE: f32 = 100.0;
/// Engine strength knob; range defined by the engine, stockfish uses 0..=20.
pub const MAX_SKILL: u8 = 20;

const MOVETIME_MS: u64 = 30;
const EVAL_DEPTH: u32 = 15;
const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Adapter around an external UCI engine process. The engine is a stateful
/// resource: a position is set and then queried, so every protocol exchange
/// goes through `&mut self` and a shared handle must be wrapped in a mutex
/// by its owner. Process faults are fatal to the operation in progress, never
/// converted to a zero score.
pub struct UciEngine {
    child: Child,
    stdin: ChildStdin,
    lines: mpsc::Receiver<std::io::Result<String>>,
    skill: u8,
}

impl UciEngine {
    /// Spawn the engine binary and run the UCI handshake.
    pub fn spawn(path: &str, skill: u8) -> Result<Self> {
        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("spawn UCI engine: {path}"))?;
        let stdin = child.stdin.take().context("engine stdin unavailable")?;
        let stdout = child.stdout.take().context("engine stdout unavailable")?;

        // Reader thread feeds a channel so queries can carry a deadline;
        // the engine itself has none.
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines() {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        let mut engine = Self {
            child,
            stdin,
            lines: rx,
            skill: skill.min(MAX_SKILL),
        };
        engine.send("uci")?;
        engine.wait_for("uciok")?;
        engine.send(&format!("setoption name Skill Level value {}", engine.skill))?;
        engine.send("setoption name Threads value 2")?;
        engine.send("isready")?;
        engine.wait_for("readyok")?;
        info!("UCI engine ready: {path} (skill {})", engine.skill);
        Ok(engine)
    }

    pub fn skill(&self) -> u8 {
        self.skill
    }

    fn send(&mut self, cmd: &str) -> Result<()> {
        writeln!(self.stdin, "{cmd}").context("write to engine")?;
        self.stdin.flush().context("flush engine stdin")?;
        Ok(())
    }

    fn next_line(&mut self) -> Result<String> {
        match self.lines.recv_timeout(QUERY_TIMEOUT) {
            Ok(Ok(line)) => Ok(line),
            Ok(Err(e)) => Err(e).context("read from engine"),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                bail!("engine query timed out after {QUERY_TIMEOUT:?}")
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => bail!("engine process closed its output"),
        }
    }

    fn wait_for(&mut self, token: &str) -> Result<()> {
        loop {
            if self.next_line()?.trim() == token {
                return Ok(());
            }
        }
    }

    /// Best move for the position, `None` on a terminal position. An engine
    /// reply that is not legal here is a malformed response.
    pub fn best_move(&mut self, pos: &Position) -> Result<Option<Move>> {
        self.send(&format!("position fen {}", pos.fen()))?;
        self.send(&format!("go movetime {MOVETIME_MS}"))?;
        loop {
            let line = self.next_line()?;
            if let Some(token) = parse_bestmove(&line) {
                let Some(uci) = token else { return Ok(None) };
                let mv = pos
                    .parse_uci(uci)
                    .with_context(|| format!("engine returned unknown move {uci}"))?;
                return Ok(Some(mv));
            }
        }
    }

    /// Score in pawns from the side to move's perspective; forced mates are
    /// clamped to +/-100. Computed fresh per call, valid only for `pos`.
    pub fn eval_position(&mut self, pos: &Position) -> Result<f32> {
        self.send(&format!("position fen {}", pos.fen()))?;
        self.send(&format!("go depth {EVAL_DEPTH}"))?;
        let mut score = None;
        loop {
            let line = self.next_line()?;
            if line.starts_with("info ") {
                if let Some(s) = parse_score(&line) {
                    score = Some(s);
                }
            }
            if line.starts_with("bestmove") {
                break;
            }
        }
        score.context("engine reported no score")
    }

    pub fn update_skill(&mut self, level: u8) -> Result<()> {
        let level = level.min(MAX_SKILL);
        self.send(&format!("setoption name Skill Level value {level}"))?;
        self.skill = level;
        info!("engine skill set to {level}");
        Ok(())
    }
}

impl Agent for UciEngine {
    fn select_move(&mut self, pos: &Position) -> Result<Option<Move>> {
        self.best_move(pos)
    }
}

impl Evaluator for UciEngine {
    fn evaluate(&mut self, pos: &Position) -> Result<f32> {
        self.eval_position(pos)
    }

    fn set_skill(&mut self, level: u8) -> Result<()> {
        self.update_skill(level)
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        let _ = self.send("quit");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// `bestmove` line -> Some(move token), with `Some(None)` for the engine's
/// no-move answers on terminal positions.
fn parse_bestmove(line: &str) -> Option<Option<&str>> {
    let rest = line.strip_prefix("bestmove")?;
    let token = rest.split_whitespace().next()?;
    if token == "(none)" || token == "0000" {
        Some(None)
    } else {
        Some(Some(token))
    }
}

/// Extract the score from an `info` line: centipawns become pawns, mate
/// announcements clamp to +/-MATE_SCORE for the side to move.
fn parse_score(line: &str) -> Option<f32> {
    let mut tokens = line.split_whitespace();
    while let Some(tok) = tokens.next() {
        if tok != "score" {
            continue;
        }
        return match (tokens.next()?, tokens.next()?) {
            ("cp", v) => v.parse::<f32>().ok().map(|cp| cp / 100.0),
            ("mate", n) => n
                .parse::<i32>()
                .ok()
                .map(|n| if n > 0 { MATE_SCORE } else { -MATE_SCORE }),
            _ => None,
        };
    }
    None
}
