use cozy_chess::{Color, Piece};
use ndarray::Array3;
use rayon::prelude::*;

use crate::board::Position;

pub const PLANES: usize = 12;
pub const BOARD_SIDE: usize = 8;

/// Plane for a piece: pawn..king are 0..5, second player's pieces offset by 6.
fn piece_plane(piece: Piece, color: Color) -> usize {
    let base = match piece {
        Piece::Pawn => 0,
        Piece::Knight => 1,
        Piece::Bishop => 2,
        Piece::Rook => 3,
        Piece::Queen => 4,
        Piece::King => 5,
    };
    base + if color == Color::Black { 6 } else { 0 }
}

/// Encode a position as 12 one-hot occupancy planes over the 8x8 grid.
/// Rows are rank-flipped (row 0 = rank 8) so the layout matches the weight
/// layout the network was trained against. Pure and deterministic; a change
/// to the plane order or orientation must be mirrored in the model.
pub fn encode(pos: &Position) -> Array3<f32> {
    let mut planes = Array3::<f32>::zeros((PLANES, BOARD_SIDE, BOARD_SIDE));
    let board = pos.board();
    for sq in board.occupied() {
        if let Some((piece, color)) = board.piece_on(sq).zip(board.color_on(sq)) {
            let plane = piece_plane(piece, color);
            let row = 7 - sq.rank() as usize;
            let col = sq.file() as usize;
            planes[[plane, row, col]] = 1.0;
        }
    }
    planes
}

/// Batch encoding for training-data preparation.
pub fn encode_batch(positions: &[Position]) -> Vec<Array3<f32>> {
    positions.par_iter().map(encode).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_startpos() {
        let pos = Position::startpos();
        let encoded = encode(&pos);

        assert_eq!(encoded.shape(), &[12, 8, 8]);

        // White pawns on rank 2 -> row 6, plane 0
        for file in 0..8 {
            assert_eq!(encoded[[0, 6, file]], 1.0);
        }
        // Black pawns on rank 7 -> row 1, plane 6
        for file in 0..8 {
            assert_eq!(encoded[[6, 1, file]], 1.0);
        }
        // Kings: white e1 -> plane 5 row 7 col 4, black e8 -> plane 11 row 0 col 4
        assert_eq!(encoded[[5, 7, 4]], 1.0);
        assert_eq!(encoded[[11, 0, 4]], 1.0);

        // Exactly one entry per piece
        let total: f32 = encoded.iter().sum();
        assert_eq!(total, 32.0);
    }

    #[test]
    fn test_encode_deterministic() {
        let pos = Position::from_fen("4k3/8/8/3q4/8/8/8/4K3 b - - 0 40").expect("valid fen");
        assert_eq!(encode(&pos), encode(&pos));
    }

    #[test]
    fn test_encode_batch_matches_single() {
        let positions = vec![
            Position::startpos(),
            Position::from_fen("4k3/pppp4/8/8/8/8/PPPP4/4K3 w - - 0 20").expect("valid fen"),
        ];
        let batch = encode_batch(&positions);
        assert_eq!(batch.len(), 2);
        for (pos, planes) in positions.iter().zip(&batch) {
            assert_eq!(planes, &encode(pos));
        }
    }
}
