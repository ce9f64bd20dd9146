use anyhow::{anyhow, Result};
use cozy_chess::{Board, Color, GameStatus, Move, Piece};

/// A rule-engine-validated board state. All legality questions are answered
/// by cozy-chess; this wrapper only adds the coordinate-string boundary and
/// the counters the move-selection policy needs.
#[derive(Clone, Debug)]
pub struct Position {
    board: Board,
}

impl Position {
    pub fn startpos() -> Self {
        Self { board: Board::default() }
    }

    pub fn from_fen(fen: &str) -> Result<Self> {
        Board::from_fen(fen, false)
            .map(|b| Self { board: b })
            .map_err(|e| anyhow!("FEN error: {e:?}"))
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    pub fn fullmove_number(&self) -> u16 {
        self.board.fullmove_number()
    }

    pub fn is_check(&self) -> bool {
        !(self.board.checkers()).is_empty()
    }

    pub fn is_game_over(&self) -> bool {
        self.board.status() != GameStatus::Ongoing
    }

    pub fn piece_count(&self) -> u32 {
        self.board.occupied().into_iter().count() as u32
    }

    /// All legal moves, in the generator's order. The order is stable for a
    /// given position but otherwise implementation-defined by cozy-chess.
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::with_capacity(48);
        self.board.generate_moves(|ml| {
            moves.extend(ml);
            false
        });
        moves
    }

    /// Applies a move that the caller has already verified against
    /// `legal_moves`. Panics on an illegal move; feeding one in on a valid
    /// position is a programmer error, not a recoverable condition.
    pub fn play(&mut self, mv: Move) {
        self.board.play(mv);
    }

    /// Parses a standard-UCI coordinate move ("e2e4", "e7e8q", "e1g1") and
    /// returns it only if it is legal here. cozy-chess generates castling as
    /// king-takes-rook, so the standard king-destination spelling is aliased
    /// onto that form.
    pub fn parse_uci(&self, uci: &str) -> Option<Move> {
        let legal = self.legal_moves();
        if let Some(m) = legal.iter().find(|m| m.to_string() == uci) {
            return Some(*m);
        }
        let aliased = match uci {
            "e1g1" => "e1h1",
            "e1c1" => "e1a1",
            "e8g8" => "e8h8",
            "e8c8" => "e8a8",
            _ => return None,
        };
        legal
            .iter()
            .find(|m| m.to_string() == aliased && self.board.piece_on(m.from) == Some(Piece::King))
            .copied()
    }

    /// Renders a legal move as standard UCI (castling as the king's two-step
    /// destination rather than cozy-chess's king-takes-rook form).
    pub fn uci(&self, mv: Move) -> String {
        let s = mv.to_string();
        if self.board.piece_on(mv.from) == Some(Piece::King) {
            match s.as_str() {
                "e1h1" => return "e1g1".to_string(),
                "e1a1" => return "e1c1".to_string(),
                "e8h8" => return "e8g8".to_string(),
                "e8a8" => return "e8c8".to_string(),
                _ => {}
            }
        }
        s
    }

    /// Square indices (rank * 8 + file, a1 = 0) of a legal move's standard-UCI
    /// from- and to-squares. This is the policy vector's from*64+to contract.
    pub fn uci_squares(&self, mv: Move) -> (usize, usize) {
        let s = self.uci(mv);
        let b = s.as_bytes();
        let from = (b[1] - b'1') as usize * 8 + (b[0] - b'a') as usize;
        let to = (b[3] - b'1') as usize * 8 + (b[2] - b'a') as usize;
        (from, to)
    }

    pub fn is_capture(&self, mv: Move) -> bool {
        let them = self.board.colors(!self.board.side_to_move());
        if them.into_iter().any(|sq| sq == mv.to) {
            return true;
        }
        // En passant: pawn changes file onto an empty square
        self.board.piece_on(mv.from) == Some(Piece::Pawn)
            && mv.from.file() != mv.to.file()
            && self.board.piece_on(mv.to).is_none()
    }

    pub fn fen(&self) -> String {
        format!("{}", self.board)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}
