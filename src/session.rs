use anyhow::Result;
use cozy_chess::Move;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::agents::{HybridArbiter, MlAgent, UciEngine};
use crate::board::Position;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("illegal move: {uci}")]
    IllegalMove { uci: String },
    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

/// Verdict on a player move, by evaluation swing in pawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Judgement {
    Good,
    Inaccuracy,
    Mistake,
    Blunder,
}

pub fn classify_blunder(before: f32, after: f32) -> Judgement {
    let diff = after - before;
    if diff <= -3.0 {
        Judgement::Blunder
    } else if diff <= -1.5 {
        Judgement::Mistake
    } else if diff <= -0.5 {
        Judgement::Inaccuracy
    } else {
        Judgement::Good
    }
}

/// Outcome of one player-move / AI-reply exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveReport {
    pub fen: String,
    pub ai_move: Option<String>,
    pub evaluation: f32,
    pub judgement: Judgement,
    pub captured: bool,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub engine_path: String,
    pub model_path: PathBuf,
    pub skill: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            engine_path: "stockfish".to_string(),
            model_path: PathBuf::from("models/checkpoints/ml.net"),
            skill: 12,
        }
    }
}

/// One game: the position, its move history, a redo stack, and the hybrid
/// arbiter that produces the AI's replies. The position advances only
/// through legality-verified pushes; history replayed from the start
/// position always reproduces the current FEN.
pub struct GameSession {
    position: Position,
    history: Vec<Move>,
    redo_stack: Vec<Move>,
    // Board before each history entry; the rule engine has no pop.
    snapshots: Vec<Position>,
    arbiter: HybridArbiter,
    config: SessionConfig,
}

impl GameSession {
    /// Spawn the engine, load the network, start from the initial position.
    pub fn connect(config: SessionConfig) -> Result<Self> {
        let arbiter = Self::build_arbiter(&config)?;
        Ok(Self::with_agents(arbiter, config))
    }

    /// Session over caller-supplied agents; used by tests and by transports
    /// that manage their own engine wiring.
    pub fn with_agents(arbiter: HybridArbiter, config: SessionConfig) -> Self {
        Self {
            position: Position::startpos(),
            history: Vec::new(),
            redo_stack: Vec::new(),
            snapshots: Vec::new(),
            arbiter,
            config,
        }
    }

    fn build_arbiter(config: &SessionConfig) -> Result<HybridArbiter> {
        let engine = UciEngine::spawn(&config.engine_path, config.skill)?;
        let ml = MlAgent::new(&config.model_path);
        Ok(HybridArbiter::new(Box::new(engine), Box::new(ml)))
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn fen(&self) -> String {
        self.position.fen()
    }

    pub fn history(&self) -> &[Move] {
        &self.history
    }

    pub fn is_game_over(&self) -> bool {
        self.position.is_game_over()
    }

    /// Apply a verified-legal move: append to history, drop any redo line.
    pub fn push(&mut self, mv: Move) -> Result<(), SessionError> {
        if !self.position.legal_moves().contains(&mv) {
            return Err(SessionError::IllegalMove { uci: mv.to_string() });
        }
        self.snapshots.push(self.position.clone());
        self.position.play(mv);
        self.history.push(mv);
        self.redo_stack.clear();
        Ok(())
    }

    pub fn push_uci(&mut self, uci: &str) -> Result<(), SessionError> {
        let mv = self
            .position
            .parse_uci(uci)
            .ok_or_else(|| SessionError::IllegalMove { uci: uci.to_string() })?;
        self.push(mv)
    }

    /// Take back the last ply. Returns false (and does nothing) when there
    /// is no history.
    pub fn undo(&mut self) -> bool {
        let (Some(mv), Some(prev)) = (self.history.pop(), self.snapshots.pop()) else {
            return false;
        };
        self.position = prev;
        self.redo_stack.push(mv);
        true
    }

    /// Reapply the most recently undone ply. False when the redo stack is
    /// empty.
    pub fn redo(&mut self) -> bool {
        let Some(mv) = self.redo_stack.pop() else {
            return false;
        };
        self.snapshots.push(self.position.clone());
        self.position.play(mv);
        self.history.push(mv);
        true
    }

    /// Take back a player+AI exchange: two plies when both exist, one when
    /// the AI never replied. Returns the number of plies undone.
    pub fn undo_pair(&mut self) -> usize {
        (0..2).filter(|_| self.undo()).count()
    }

    pub fn redo_pair(&mut self) -> usize {
        (0..2).filter(|_| self.redo()).count()
    }

    /// Ask the arbiter for the AI's move in the current position. The move
    /// is returned, not applied; `Ok(None)` means terminal or a disabled
    /// agent, and the game should be treated as over or stalled.
    pub fn select_ai_move(&mut self) -> Result<Option<Move>> {
        self.arbiter.select_ai_move(&self.position)
    }

    /// Engine evaluation of the current position, in pawns for the side to
    /// move. Never cached: it is only valid for this exact position.
    pub fn evaluate(&mut self) -> Result<f32> {
        self.arbiter.evaluator_mut().evaluate(&self.position)
    }

    pub fn set_skill(&mut self, level: u8) -> Result<()> {
        self.config.skill = level.min(crate::agents::engine::MAX_SKILL);
        self.arbiter.evaluator_mut().set_skill(level)
    }

    /// Full exchange: evaluate, verify and push the player's move, judge it
    /// by the evaluation swing, then push the AI's reply if the game is
    /// still on.
    pub fn play_exchange(&mut self, uci: &str) -> Result<MoveReport, SessionError> {
        let before = self.evaluate()?;
        let mv = self
            .position
            .parse_uci(uci)
            .ok_or_else(|| SessionError::IllegalMove { uci: uci.to_string() })?;
        let captured = self.position.is_capture(mv);
        self.push(mv)?;
        let after = self.evaluate()?;
        let judgement = classify_blunder(before, after);

        let mut ai_move = None;
        if !self.position.is_game_over() {
            if let Some(reply) = self.select_ai_move()? {
                ai_move = Some(self.position.uci(reply));
                self.push(reply)?;
            }
        }

        Ok(MoveReport {
            fen: self.fen(),
            ai_move,
            evaluation: after,
            judgement,
            captured,
        })
    }

    /// Destination squares (as names) of legal moves leaving the given
    /// square.
    pub fn legal_moves_from(&self, square: &str) -> Vec<String> {
        self.position
            .legal_moves()
            .into_iter()
            .map(|mv| self.position.uci(mv))
            .filter(|uci| uci.starts_with(square))
            .map(|uci| uci[2..4].to_string())
            .collect()
    }

    /// Rebase the session on an arbitrary position, discarding history.
    pub fn set_position(&mut self, pos: Position) {
        self.position = pos;
        self.history.clear();
        self.redo_stack.clear();
        self.snapshots.clear();
    }

    /// Drop all game state, keep the current agents.
    pub fn clear(&mut self) {
        self.set_position(Position::startpos());
    }

    /// Full reset: fresh start position AND fresh agent instances. The old
    /// engine process may still be bound to a previous position, so it is
    /// replaced, not resynchronized.
    pub fn reset(&mut self) -> Result<()> {
        self.arbiter = Self::build_arbiter(&self.config)?;
        self.clear();
        Ok(())
    }
}
