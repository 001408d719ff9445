use crate::render::render;
use paro_lib::board::{parse_cell, BoardState, Cell, LegalMoves};
use std::io::{self, BufRead, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
   Move(Cell),
   Hint,
}

pub fn parse_input(line: &str) -> Result<Input, String> {
   let line = line.trim();
   if line.starts_with('?') {
      return Ok(Input::Hint);
   }
   parse_cell(&line.to_ascii_lowercase()).map(Input::Move)
}

/// Prompts until a legal move is entered. `?` redraws the board with the legal cells marked.
/// Returns `None` once the input is exhausted.
pub fn read_move<R: BufRead, W: Write>(
   input: &mut R,
   out: &mut W,
   board: &BoardState,
   moves: &LegalMoves,
) -> io::Result<Option<Cell>> {
   let mut line_buf = String::new();
   loop {
      out.write_all(b"enter your move: ")?;
      out.flush()?;
      line_buf.clear();
      if input.read_line(&mut line_buf)? == 0 {
         return Ok(None);
      }
      if line_buf.trim().is_empty() {
         continue;
      }
      match parse_input(&line_buf) {
         Ok(Input::Hint) => {
            out.write_all(render(board, Some(moves.set)).as_bytes())?;
         }
         Ok(Input::Move(cell)) if moves.contains(cell) => return Ok(Some(cell)),
         Ok(Input::Move(_)) => {
            out.write_all(b"illegal move\n")?;
         }
         Err(e) => {
            writeln!(out, "{}", e)?;
         }
      }
   }
}
