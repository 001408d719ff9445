use paro_lib::board::{BoardState, Cell, Colour, MAX_X, MAX_Y};
use std::fmt::Write;

/// Draws the board with row numbers and file letters. Cells in `hints` that are still empty are
/// marked with `@`.
pub fn render(board: &BoardState, hints: Option<u64>) -> String {
   let mut out = String::from("\n================================\n");
   for y in (0..MAX_Y).rev() {
      let _ = write!(out, " {} ", y + 1);
      for x in 0..MAX_X {
         let cell = (y * MAX_X + x) as Cell;
         let c = match board.colour_at(cell) {
            Some(Colour::White) => 'W',
            Some(Colour::Black) => 'B',
            None if hints.map_or(false, |h| h & (1 << cell) != 0) => '@',
            None => '.',
         };
         let _ = write!(out, " {} ", c);
      }
      out.push('\n');
   }
   out.push('\n');
   out.push_str("    a  b  c  d  e  f  g  h\n");
   out
}
