use crate::board::{BoardState, Cell, Colour};
use crate::eval::{evaluate, Score, Weights};

/// Per-search state handed down through the recursion instead of living in globals. Each worker
/// owns its own context; counts are merged by whoever collects the results.
#[derive(Clone, Debug, Default)]
pub struct SearchContext {
   pub weights: Weights,
   /// Number of positions scored since the last reset
   pub positions_explored: u64,
}

impl SearchContext {
   pub fn new(weights: Weights) -> SearchContext {
      SearchContext {
         weights,
         positions_explored: 0,
      }
   }

   pub fn reset(&mut self) {
      self.positions_explored = 0;
   }

   fn evaluate(&mut self, board: &BoardState, terminal: bool) -> Score {
      self.positions_explored += 1;
      evaluate(board, terminal, &self.weights)
   }
}

/// Scores `mv` played by `mover` on `board`, looking `depth` further plies past it. `None` is a
/// pass. White maximises, black minimises; the result is clamped to `alpha..=beta`.
pub fn alpha_beta(
   ctx: &mut SearchContext,
   mv: Option<Cell>,
   board: BoardState,
   depth: u32,
   mover: Colour,
   mut alpha: Score,
   mut beta: Score,
) -> Score {
   let board = match mv {
      Some(cell) => board.apply_move(cell, mover).board,
      None => board,
   };

   if depth == 0 {
      return ctx.evaluate(&board, false);
   }

   let replier = !mover;
   let moves = board.legal_moves(replier);
   if moves.is_empty() {
      if mv.is_none() {
         // neither side can move
         return ctx.evaluate(&board, true);
      }
      // replier passes and the turn comes back round to mover
      return alpha_beta(ctx, None, board, depth, replier, alpha, beta);
   }

   match replier {
      Colour::White => {
         for cell in moves.cells {
            let score = alpha_beta(ctx, Some(cell), board, depth - 1, replier, alpha, beta);
            if score > alpha {
               alpha = score;
            }
            if alpha >= beta {
               return alpha;
            }
         }
         alpha
      }
      Colour::Black => {
         for cell in moves.cells {
            let score = alpha_beta(ctx, Some(cell), board, depth - 1, replier, alpha, beta);
            if score < beta {
               beta = score;
            }
            if alpha >= beta {
               // white already has something better earlier in the tree
               return beta;
            }
         }
         beta
      }
   }
}
