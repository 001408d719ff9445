use crate::board::{BoardState, Colour, CELLS, CORNERS};

/// Positive favours white, negative favours black.
pub type Score = i32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Weights {
   pub piece: Score,
   pub corner: Score,
}

impl Weights {
   /// Plain disc count.
   pub const PLAIN: Weights = Weights { piece: 1, corner: 0 };
   /// Disc count with a premium on holding corners.
   pub const CORNERS: Weights = Weights {
      piece: 64,
      corner: 64 * 4,
   };

   /// Magnitude of a decided game. One more than any evaluation of an undecided position can
   /// reach, so a win always outranks a good-looking position.
   pub fn win_score(&self) -> Score {
      CELLS as Score * self.piece + CORNERS.len() as Score * self.corner + 1
   }

   pub fn min_score(&self) -> Score {
      -self.win_score()
   }

   pub fn max_score(&self) -> Score {
      self.win_score()
   }
}

impl Default for Weights {
   fn default() -> Weights {
      Weights::PLAIN
   }
}

fn signed(colour: Colour, value: Score) -> Score {
   match colour {
      Colour::White => value,
      Colour::Black => -value,
   }
}

/// Scores `board` with `weights`. A full board, or one the caller declares final, collapses any
/// nonzero disc difference to the win/lose magnitude; a drawn final position scores zero.
pub fn evaluate(board: &BoardState, terminal: bool, weights: &Weights) -> Score {
   let difference = board.disc_difference();
   if terminal || board.is_full() {
      return match difference {
         0 => 0,
         d if d > 0 => weights.win_score(),
         _ => -weights.win_score(),
      };
   }

   let mut score = difference * weights.piece;
   for corner in CORNERS.iter() {
      if let Some(colour) = board.colour_at(*corner) {
         score += signed(colour, weights.corner);
      }
   }
   score
}
