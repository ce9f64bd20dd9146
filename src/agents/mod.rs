use anyhow::Result;
use cozy_chess::Move;
use log::debug;

use crate::board::Position;

pub mod engine;
pub mod ml;
pub mod random;

pub use engine::UciEngine;
pub use ml::MlAgent;
pub use random::RandomAgent;

/// Anything that can propose a move. `Ok(None)` is the normal terminal
/// signal (no legal move, or the agent has degraded itself); `Err` is an
/// external fault such as a dead engine process.
pub trait Agent: Send {
    fn select_move(&mut self, pos: &Position) -> Result<Option<Move>>;
}

/// Extended capability of search-backed agents: a position score in pawns
/// and a strength knob.
pub trait Evaluator: Agent {
    fn evaluate(&mut self, pos: &Position) -> Result<f32>;
    fn set_skill(&mut self, level: u8) -> Result<()>;
}

/// Opening gate: positions at or below this fullmove number go to the engine.
pub const OPENING_FULLMOVE_LIMIT: u16 = 8;
/// At or below this many pieces the position is treated as an endgame.
pub const ENDGAME_PIECE_LIMIT: u32 = 10;

/// Game-phase classification used to route move selection. Tested in this
/// precedence order; the thresholds are tunable policy, the order is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Opening,
    Check,
    Endgame,
    Middlegame,
}

impl Phase {
    pub fn classify(pos: &Position) -> Phase {
        if pos.fullmove_number() <= OPENING_FULLMOVE_LIMIT {
            Phase::Opening
        } else if pos.is_check() {
            Phase::Check
        } else if pos.piece_count() <= ENDGAME_PIECE_LIMIT {
            Phase::Endgame
        } else {
            Phase::Middlegame
        }
    }
}

/// Routes each turn to the search engine or the learned policy. The engine
/// is authoritative in the opening, in check, and in sparse endgames; the
/// learned agent plays quiet middlegames only. No cascade: whatever the
/// routed agent answers is the answer.
pub struct HybridArbiter {
    engine: Box<dyn Evaluator>,
    ml: Box<dyn Agent>,
}

impl HybridArbiter {
    pub fn new(engine: Box<dyn Evaluator>, ml: Box<dyn Agent>) -> Self {
        Self { engine, ml }
    }

    pub fn select_ai_move(&mut self, pos: &Position) -> Result<Option<Move>> {
        let phase = Phase::classify(pos);
        debug!(
            "arbiter: fullmove {} pieces {} -> {:?}",
            pos.fullmove_number(),
            pos.piece_count(),
            phase
        );
        match phase {
            Phase::Opening | Phase::Check | Phase::Endgame => self.engine.select_move(pos),
            Phase::Middlegame => self.ml.select_move(pos),
        }
    }

    /// The search-backed side of the arbiter, for evaluation queries.
    pub fn evaluator_mut(&mut self) -> &mut dyn Evaluator {
        self.engine.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_startpos_is_opening() {
        assert_eq!(Phase::classify(&Position::startpos()), Phase::Opening);
    }

    #[test]
    fn classify_check_after_opening() {
        // Black king in check at move 12
        let pos = Position::from_fen("rnbq1bnr/pppp1kpp/5p2/4p2Q/4P3/8/PPPP1PPP/RNB1KBNR b KQ - 1 12")
            .expect("valid fen");
        assert!(pos.is_check());
        assert_eq!(Phase::classify(&pos), Phase::Check);
    }

    #[test]
    fn classify_piece_boundary() {
        let ten = Position::from_fen("4k3/pppp4/8/8/8/8/PPPP4/4K3 w - - 0 20").expect("valid fen");
        assert_eq!(ten.piece_count(), 10);
        assert_eq!(Phase::classify(&ten), Phase::Endgame);

        let eleven =
            Position::from_fen("4k3/pppp4/8/8/8/8/PPPPP3/4K3 w - - 0 20").expect("valid fen");
        assert_eq!(eleven.piece_count(), 11);
        assert_eq!(Phase::classify(&eleven), Phase::Middlegame);
    }
}
