use crate::board::{BoardState, Cell, Colour};
use crate::config::EngineConfig;
use crate::dispatch::{Dispatcher, ParallelDispatcher, ResultRegion, RootSearch};
use crate::error::{EngineError, EngineResult};
use crate::eval::{Score, Weights};
use crate::messages::{EngineMessage, InterfaceMessage};
use log::{debug, info, trace};
use std::cmp::{max, min};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How the next search depth moved after a decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Adjustment {
   Reduced,
   Increased,
   Unchanged,
}

/// Search depth that carries over from one decision to the next and follows how long the last
/// decision took.
#[derive(Clone, Debug)]
pub struct DepthControl {
   depth: u32,
   max_ply: u32,
   budget: Duration,
}

impl DepthControl {
   pub fn new(depth: u32, max_ply: u32, budget: Duration) -> DepthControl {
      DepthControl {
         depth: max(depth, 1),
         max_ply: max(max_ply, 1),
         budget,
      }
   }

   pub fn depth(&self) -> u32 {
      self.depth
   }

   pub fn set_depth(&mut self, depth: u32) {
      self.depth = max(depth, 1);
   }

   /// Limits the depth to what is left of the game and to the ply ceiling. The limit sticks.
   pub fn clamp(&mut self, empty_cells: u32) -> u32 {
      self.depth = max(min(min(self.depth, empty_cells), self.max_ply), 1);
      self.depth
   }

   pub fn adapt(&mut self, elapsed: Duration) -> Adjustment {
      if elapsed > self.budget {
         if self.depth > 1 {
            self.depth = max(self.depth.saturating_sub(2), 1);
            return Adjustment::Reduced;
         }
      } else if elapsed < self.budget / 10 {
         self.depth += 2;
         return Adjustment::Increased;
      }
      Adjustment::Unchanged
   }
}

/// What a completed search found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchReport {
   pub cell: Cell,
   pub score: Score,
   pub depth: u32,
   /// The search reached the last empty cell
   pub sees_end: bool,
   /// Side the search found a forced win for, if any
   pub forced_winner: Option<Colour>,
   pub positions_explored: u64,
   pub elapsed: Duration,
   pub adjustment: Adjustment,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
   /// Only one move was legal, so nothing was searched
   Forced(Cell),
   Searched(SearchReport),
}

impl Decision {
   pub fn cell(&self) -> Cell {
      match self {
         Decision::Forced(cell) => *cell,
         Decision::Searched(report) => report.cell,
      }
   }
}

pub struct Engine {
   weights: Weights,
   control: DepthControl,
   dispatcher: Dispatcher,
}

impl Engine {
   pub fn new(config: &EngineConfig) -> EngineResult<Engine> {
      let dispatcher = if config.parallel {
         let region = Arc::new(ResultRegion::new());
         Dispatcher::Parallel(ParallelDispatcher::new(region, config.workers)?)
      } else {
         Dispatcher::Sequential
      };
      Ok(Engine::with_dispatcher(config, dispatcher))
   }

   pub fn with_dispatcher(config: &EngineConfig, dispatcher: Dispatcher) -> Engine {
      debug!("engine using the {} dispatcher", dispatcher.name());
      Engine {
         weights: config.weights(),
         control: DepthControl::new(config.initial_depth, config.max_ply, config.move_budget()),
         dispatcher,
      }
   }

   pub fn depth(&self) -> u32 {
      self.control.depth()
   }

   pub fn set_depth(&mut self, depth: u32) {
      self.control.set_depth(depth);
   }

   pub fn decide_move(&mut self, board: BoardState, mover: Colour, candidates: &[Cell]) -> EngineResult<Decision> {
      match candidates {
         [] => return Err(EngineError::NoCandidates),
         [only] => return Ok(Decision::Forced(*only)),
         _ => (),
      }

      let empty = board.empty_cells();
      let depth = self.control.clamp(empty);
      let root = RootSearch {
         candidates,
         board,
         depth,
         mover,
         weights: self.weights,
      };
      let search_time_start = Instant::now();
      let outcome = self.dispatcher.search(&root)?;
      let elapsed = search_time_start.elapsed();
      trace!(
         "search @ depth {} took {}s and explored {} positions",
         depth,
         elapsed.as_secs_f64(),
         outcome.positions_explored
      );

      let adjustment = self.control.adapt(elapsed);
      if adjustment != Adjustment::Unchanged {
         info!("search depth {:?}: {} -> {}", adjustment, depth, self.control.depth());
      }

      let win = self.weights.win_score();
      let forced_winner = if outcome.score >= win {
         Some(Colour::White)
      } else if outcome.score <= -win {
         Some(Colour::Black)
      } else {
         None
      };
      Ok(Decision::Searched(SearchReport {
         cell: candidates[outcome.best],
         score: outcome.score,
         depth,
         sees_end: depth >= empty,
         forced_winner,
         positions_explored: outcome.positions_explored,
         elapsed,
         adjustment,
      }))
   }
}

/// Plays `cell` for `mover`, refusing moves that capture nothing.
pub fn play(board: &BoardState, cell: Cell, mover: Colour) -> EngineResult<BoardState> {
   let placement = board.apply_move(cell, mover);
   if !placement.is_legal() {
      return Err(EngineError::IllegalMove { cell });
   }
   Ok(placement.board)
}

pub fn start(config: EngineConfig, receiver: mpsc::Receiver<InterfaceMessage>, sender: mpsc::Sender<EngineMessage>) {
   let mut engine = match Engine::new(&config) {
      Ok(engine) => engine,
      Err(e) => {
         let _ = sender.send(EngineMessage::Failed(e));
         return;
      }
   };
   while let Ok(message) = receiver.recv() {
      let reply = match message {
         InterfaceMessage::Go { board, mover } => {
            let moves = board.legal_moves(mover);
            match engine.decide_move(board, mover, &moves.cells) {
               Ok(decision) => EngineMessage::Decided(decision),
               Err(e) => EngineMessage::Failed(e),
            }
         }
         InterfaceMessage::SetDepth(depth) => {
            engine.set_depth(depth);
            continue;
         }
         InterfaceMessage::QueryDepth => EngineMessage::Depth(engine.depth()),
      };
      if sender.send(reply).is_err() {
         break;
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use std::thread;

   fn config(parallel: bool, depth: u32) -> EngineConfig {
      EngineConfig {
         initial_depth: depth,
         max_ply: 14,
         time_per_move: 10,
         parallel,
         workers: 2,
         corner_scores: false,
      }
   }

   #[test]
   fn slow_searches_get_shallower() {
      let mut control = DepthControl::new(6, 14, Duration::from_secs(10));
      for expected in [4, 2, 1, 1] {
         control.adapt(Duration::from_secs(11));
         assert_eq!(control.depth(), expected);
      }
   }

   #[test]
   fn fast_searches_get_deeper() {
      let mut control = DepthControl::new(6, 14, Duration::from_secs(10));
      assert_eq!(control.adapt(Duration::from_millis(500)), Adjustment::Increased);
      assert_eq!(control.depth(), 8);
      assert_eq!(control.adapt(Duration::from_secs(5)), Adjustment::Unchanged);
      assert_eq!(control.depth(), 8);
      assert_eq!(control.adapt(Duration::from_secs(10)), Adjustment::Unchanged);
      assert_eq!(control.adapt(Duration::from_secs(30)), Adjustment::Reduced);
      assert_eq!(control.depth(), 6);
   }

   #[test]
   fn clamping_persists() {
      let mut control = DepthControl::new(20, 14, Duration::from_secs(10));
      assert_eq!(control.clamp(60), 14);
      assert_eq!(control.clamp(5), 5);
      // the game ending early does not give the depth back
      assert_eq!(control.depth(), 5);
      assert_eq!(control.clamp(60), 5);
   }

   #[test]
   fn forced_move_is_not_searched() {
      let mut engine = Engine::new(&config(false, 6)).unwrap();
      let board = BoardState::from_start();
      assert_eq!(
         engine.decide_move(board, Colour::Black, &[20]).unwrap(),
         Decision::Forced(20)
      );
      assert_eq!(engine.depth(), 6);
      assert_eq!(
         engine.decide_move(board, Colour::Black, &[]),
         Err(EngineError::NoCandidates)
      );
   }

   #[test]
   fn opening_decision() {
      for parallel in [false, true] {
         let mut engine = Engine::new(&config(parallel, 1)).unwrap();
         let board = BoardState::from_start();
         let moves = board.legal_moves(Colour::Black);
         let report = match engine.decide_move(board, Colour::Black, &moves.cells).unwrap() {
            Decision::Searched(report) => report,
            other => panic!("expected a search, got {:?}", other),
         };
         assert_eq!(report.cell, 20);
         assert_eq!(report.score, -3);
         assert_eq!(report.depth, 1);
         assert_eq!(report.positions_explored, 4);
         assert!(!report.sees_end);
         assert_eq!(report.forced_winner, None);
      }
   }

   #[test]
   fn sees_a_forced_win() {
      // black to move with two cells left; either move takes white's last disc
      let board: BoardState = "
         BBBBBBBB
         BBBBBBBB
         BBBBBBBB
         BBBBBBBB
         BBBBBBBB
         B.BBBBBB
         BW.BBBBB
         BBBBBBBB"
         .parse()
         .unwrap();
      let moves = board.legal_moves(Colour::Black);
      assert_eq!(&moves.cells[..], &[10, 17]);
      let mut engine = Engine::new(&config(false, 6)).unwrap();
      let report = match engine.decide_move(board, Colour::Black, &moves.cells).unwrap() {
         Decision::Searched(report) => report,
         other => panic!("expected a search, got {:?}", other),
      };
      assert_eq!(report.depth, 2);
      assert!(report.sees_end);
      assert_eq!(report.forced_winner, Some(Colour::Black));
      assert_eq!(report.score, Weights::PLAIN.min_score());
   }

   #[test]
   fn play_rejects_illegal_moves() {
      let board = BoardState::from_start();
      assert_eq!(play(&board, 0, Colour::Black), Err(EngineError::IllegalMove { cell: 0 }));
      let after = play(&board, 20, Colour::Black).unwrap();
      assert_eq!(after.count(Colour::Black), 4);
   }

   #[test]
   fn message_loop() {
      let (ite_tx, ite_rx) = mpsc::channel();
      let (eti_tx, eti_rx) = mpsc::channel();
      let engine = thread::spawn(move || start(config(true, 1), ite_rx, eti_tx));

      ite_tx.send(InterfaceMessage::QueryDepth).unwrap();
      assert!(matches!(eti_rx.recv().unwrap(), EngineMessage::Depth(1)));

      ite_tx
         .send(InterfaceMessage::Go {
            board: BoardState::from_start(),
            mover: Colour::Black,
         })
         .unwrap();
      match eti_rx.recv().unwrap() {
         EngineMessage::Decided(decision) => assert_eq!(decision.cell(), 20),
         _ => panic!("expected a decision"),
      }

      ite_tx.send(InterfaceMessage::SetDepth(4)).unwrap();
      ite_tx.send(InterfaceMessage::QueryDepth).unwrap();
      assert!(matches!(eti_rx.recv().unwrap(), EngineMessage::Depth(4)));

      drop(ite_tx);
      engine.join().unwrap();
   }
}
