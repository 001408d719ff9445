use crate::human::read_move;
use crate::render::render;
use log::trace;
use paro_lib::board::{cell_name, BoardState, Colour};
use paro_lib::engine::{play, Adjustment, Decision, SearchReport};
use paro_lib::messages::{EngineMessage, InterfaceMessage};
use std::io::{self, BufRead, Write};
use std::sync::mpsc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Player {
   Human,
   Computer,
}

#[derive(Clone, Copy, Debug)]
pub struct Players {
   pub black: Player,
   pub white: Player,
}

impl Players {
   pub fn get(&self, colour: Colour) -> Player {
      match colour {
         Colour::Black => self.black,
         Colour::White => self.white,
      }
   }
}

enum Turn {
   Moved,
   Passed,
   Quit,
}

pub struct Game<R, W> {
   board: BoardState,
   players: Players,
   sender: mpsc::Sender<InterfaceMessage>,
   receiver: mpsc::Receiver<EngineMessage>,
   input: R,
   out: W,
}

impl<R: BufRead, W: Write> Game<R, W> {
   pub fn new(
      players: Players,
      sender: mpsc::Sender<InterfaceMessage>,
      receiver: mpsc::Receiver<EngineMessage>,
      input: R,
      out: W,
   ) -> Game<R, W> {
      Game {
         board: BoardState::from_start(),
         players,
         sender,
         receiver,
         input,
         out,
      }
   }

   /// Plays black then white in turn until the board fills, both sides pass in a row, or the
   /// human's input runs out.
   pub fn run(&mut self) -> Result<BoardState, String> {
      let mut mover = Colour::Black;
      let mut passes = 0;
      while passes < 2 && !self.board.is_full() {
         let turn = match self.players.get(mover) {
            Player::Human => self.human_turn(mover),
            Player::Computer => self.computer_turn(mover),
         }?;
         match turn {
            Turn::Moved => passes = 0,
            Turn::Passed => passes += 1,
            Turn::Quit => return Ok(self.board),
         }
         mover = !mover;
      }
      self.out.write_all(render(&self.board, None).as_bytes()).map_err(io_error)?;
      self.announce_result().map_err(io_error)?;
      Ok(self.board)
   }

   fn human_turn(&mut self, mover: Colour) -> Result<Turn, String> {
      self.out.write_all(render(&self.board, None).as_bytes()).map_err(io_error)?;
      let moves = self.board.legal_moves(mover);
      let cell = match moves.cells.as_slice() {
         [] => {
            writeln!(self.out, "you cannot move...").map_err(io_error)?;
            return Ok(Turn::Passed);
         }
         [only] => {
            writeln!(
               self.out,
               "you are forced to play the only move available which is {}",
               cell_name(*only)
            )
            .map_err(io_error)?;
            *only
         }
         _ => match read_move(&mut self.input, &mut self.out, &self.board, &moves).map_err(io_error)? {
            Some(cell) => cell,
            None => return Ok(Turn::Quit),
         },
      };
      self.board = play(&self.board, cell, mover).map_err(|e| e.to_string())?;
      Ok(Turn::Moved)
   }

   fn computer_turn(&mut self, mover: Colour) -> Result<Turn, String> {
      self.out.write_all(render(&self.board, None).as_bytes()).map_err(io_error)?;
      if !self.board.has_legal_move(mover) {
         writeln!(self.out, "I cannot move...").map_err(io_error)?;
         return Ok(Turn::Passed);
      }
      self
         .sender
         .send(InterfaceMessage::Go {
            board: self.board,
            mover,
         })
         .map_err(|_| "engine thread has stopped".to_string())?;
      let decision = match self.receiver.recv() {
         Ok(EngineMessage::Decided(decision)) => decision,
         Ok(EngineMessage::Failed(e)) => return Err(e.to_string()),
         Ok(EngineMessage::Depth(_)) => return Err("engine answered with a depth instead of a move".to_string()),
         Err(_) => return Err("engine thread has stopped".to_string()),
      };
      trace!("{} decided {:?}", mover, decision);
      self.narrate(mover, &decision).map_err(io_error)?;
      self.board = play(&self.board, decision.cell(), mover).map_err(|e| e.to_string())?;
      Ok(Turn::Moved)
   }

   fn narrate(&mut self, mover: Colour, decision: &Decision) -> io::Result<()> {
      let report: &SearchReport = match decision {
         Decision::Forced(_) => {
            return writeln!(self.out, "My move is forced, so I'm not going to delay by considering it..");
         }
         Decision::Searched(report) => report,
      };
      let out = &mut self.out;
      writeln!(out, "I'm going to look {} moves ahead...", report.depth)?;
      if report.sees_end {
         writeln!(out, "I should be able to see the end position...")?;
      }
      match report.forced_winner {
         Some(winner) if winner == mover => writeln!(out, "I think I can force a win")?,
         Some(_) => writeln!(out, "You should be able to force a win")?,
         None => (),
      }
      let score = relative_to(mover, report.score);
      if report.sees_end {
         writeln!(out, "I can see the end of the game and by playing {}", cell_name(report.cell))?;
         writeln!(out, "will give me a final score of at least {}", score)?;
      } else {
         writeln!(out, "I'm playing {} which will give me a score of {}", cell_name(report.cell), score)?;
      }
      let seconds = report.elapsed.as_secs_f64();
      if report.adjustment == Adjustment::Reduced {
         writeln!(
            out,
            "I took {:.1} seconds and evaluated {} positions,\nsorry about the wait, I took too long so\nI will reduce my search next go..",
            seconds, report.positions_explored
         )
      } else {
         writeln!(
            out,
            "time took {:.1} seconds and evaluated {} positions",
            seconds, report.positions_explored
         )
      }
   }

   fn announce_result(&mut self) -> io::Result<()> {
      let difference = self.board.disc_difference();
      let winner = match difference {
         0 => None,
         d if d > 0 => Some(Colour::White),
         _ => Some(Colour::Black),
      };
      let margin = difference.abs();
      write!(self.out, "end of the game and ")?;
      match winner {
         None => writeln!(self.out, "the result is a draw"),
         Some(colour) => match (self.players.get(colour), self.players.get(!colour)) {
            (Player::Computer, Player::Human) => writeln!(self.out, "I won by {} tiles", margin),
            (Player::Human, Player::Computer) => writeln!(self.out, "you beat me by {} tiles", margin),
            _ => writeln!(self.out, "{} won by {} tiles", colour, margin),
         },
      }
   }
}

/// Flips a white-positive score to the point of view of `colour`.
fn relative_to(colour: Colour, score: i32) -> i32 {
   match colour {
      Colour::White => score,
      Colour::Black => -score,
   }
}

fn io_error(e: io::Error) -> String {
   format!("Encountered I/O error: {}", e)
}
