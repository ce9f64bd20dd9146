use anyhow::Result;
use cozy_chess::Move;
use log::{info, warn};
use std::path::Path;

use crate::agents::Agent;
use crate::board::Position;
use crate::encoder;
use crate::network::ChessNet;

/// Learned-policy agent with an explicit two-state lifecycle: a failed
/// weight load disables it permanently and it answers `None` from then on,
/// so the surrounding system can always fall back. It never raises.
pub struct MlAgent {
    net: Option<ChessNet>,
}

impl MlAgent {
    /// Try to load weights once. A missing or corrupt checkpoint produces a
    /// disabled agent, logged, not an error.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Self {
        match ChessNet::load(&model_path) {
            Ok(net) => {
                info!("policy network loaded from {}", model_path.as_ref().display());
                Self { net: Some(net) }
            }
            Err(e) => {
                warn!(
                    "policy network unavailable ({e:#}); ML agent disabled, will always pass"
                );
                Self { net: None }
            }
        }
    }

    pub fn disabled() -> Self {
        Self { net: None }
    }

    pub fn with_net(net: ChessNet) -> Self {
        Self { net: Some(net) }
    }

    pub fn is_enabled(&self) -> bool {
        self.net.is_some()
    }

    /// Highest-scoring legal move under the policy head, or `None` when
    /// disabled or the position is terminal. Ties go to the move the rule
    /// engine enumerates first.
    pub fn select_move(&self, pos: &Position) -> Option<Move> {
        let net = self.net.as_ref()?;
        let legal = pos.legal_moves();
        if legal.is_empty() {
            return None;
        }

        let planes = encoder::encode(pos);
        let (policy, _value) = net.forward(&planes);

        let mut best: Option<(Move, f32)> = None;
        for mv in legal {
            let (from, to) = pos.uci_squares(mv);
            let score = policy[from * 64 + to];
            match best {
                Some((_, s)) if score <= s => {}
                _ => best = Some((mv, score)),
            }
        }
        best.map(|(mv, _)| mv)
    }
}

impl Agent for MlAgent {
    fn select_move(&mut self, pos: &Position) -> Result<Option<Move>> {
        Ok(MlAgent::select_move(self, pos))
    }
}
