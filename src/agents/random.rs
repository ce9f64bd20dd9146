use anyhow::Result;
use cozy_chess::Move;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::agents::Agent;
use crate::board::Position;

/// Uniform-random legal move. The weakest baseline; handy in tests and as a
/// stand-in where no engine or network is wired up.
pub struct RandomAgent {
    rng: SmallRng,
}

impl RandomAgent {
    pub fn new() -> Self {
        Self { rng: SmallRng::from_entropy() }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { rng: SmallRng::seed_from_u64(seed) }
    }
}

impl Default for RandomAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for RandomAgent {
    fn select_move(&mut self, pos: &Position) -> Result<Option<Move>> {
        let moves = pos.legal_moves();
        if moves.is_empty() {
            Ok(None)
        } else {
            Ok(Some(moves[self.rng.gen_range(0..moves.len())]))
        }
    }
}
