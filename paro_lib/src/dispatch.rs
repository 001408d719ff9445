use crate::board::{BoardState, Cell, Colour};
use crate::error::{EngineError, EngineResult};
use crate::eval::{Score, Weights};
use crate::ipc::{MailboxHandle, MailboxRegion, SemHandle};
use crate::search::{alpha_beta, SearchContext};
use log::{debug, error, trace, warn};
use std::sync::Arc;
use std::thread;

/// What a worker reports for one root candidate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchResult {
   pub score: Score,
   /// Position of the move in the candidate list, since results arrive in completion order
   pub candidate: usize,
   pub positions_explored: u64,
}

pub type ResultRegion = MailboxRegion<SearchResult>;

/// A root search: every candidate is scored on its own against the full window, `depth` plies
/// deep counting the candidate itself.
#[derive(Clone, Copy, Debug)]
pub struct RootSearch<'a> {
   pub candidates: &'a [Cell],
   pub board: BoardState,
   pub depth: u32,
   pub mover: Colour,
   pub weights: Weights,
}

impl<'a> RootSearch<'a> {
   fn job(&self, candidate: usize) -> Job {
      Job {
         candidate,
         cell: self.candidates[candidate],
         board: self.board,
         depth: self.depth,
         mover: self.mover,
         weights: self.weights,
      }
   }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchOutcome {
   pub score: Score,
   /// Index into the candidate list
   pub best: usize,
   pub positions_explored: u64,
}

#[derive(Clone, Copy, Debug)]
struct Job {
   candidate: usize,
   cell: Cell,
   board: BoardState,
   depth: u32,
   mover: Colour,
   weights: Weights,
}

impl Job {
   fn run(self) -> SearchResult {
      let mut ctx = SearchContext::new(self.weights);
      let score = alpha_beta(
         &mut ctx,
         Some(self.cell),
         self.board,
         self.depth.saturating_sub(1),
         self.mover,
         self.weights.min_score(),
         self.weights.max_score(),
      );
      SearchResult {
         score,
         candidate: self.candidate,
         positions_explored: ctx.positions_explored,
      }
   }
}

/// Keeps the best result for the side to move: highest score for white, lowest for black, the
/// lower candidate index on a tie.
struct Collector {
   mover: Colour,
   best: Option<SearchResult>,
   positions_explored: u64,
}

impl Collector {
   fn new(mover: Colour) -> Collector {
      Collector {
         mover,
         best: None,
         positions_explored: 0,
      }
   }

   fn prefers(&self, challenger: &SearchResult, best: &SearchResult) -> bool {
      let better = match self.mover {
         Colour::White => challenger.score > best.score,
         Colour::Black => challenger.score < best.score,
      };
      better || (challenger.score == best.score && challenger.candidate < best.candidate)
   }

   fn offer(&mut self, result: SearchResult) {
      self.positions_explored += result.positions_explored;
      let replace = match self.best {
         Some(ref best) => self.prefers(&result, best),
         None => true,
      };
      if replace {
         self.best = Some(result);
      }
   }

   fn finish(self) -> EngineResult<SearchOutcome> {
      let best = self.best.ok_or(EngineError::NoCandidates)?;
      Ok(SearchOutcome {
         score: best.score,
         best: best.candidate,
         positions_explored: self.positions_explored,
      })
   }
}

/// Scores the candidates one after another on the calling thread.
pub fn sequential_search(root: &RootSearch) -> EngineResult<SearchOutcome> {
   let mut collector = Collector::new(root.mover);
   for candidate in 0..root.candidates.len() {
      collector.offer(root.job(candidate).run());
   }
   collector.finish()
}

/// Fans candidates out to a fixed set of worker threads.
///
/// A source thread takes one ticket per candidate before handing it to a worker, so no more
/// candidates are in flight than there are tickets. Workers post their result to a mailbox and
/// give the ticket back; the calling thread reads exactly one result per candidate, in whatever
/// order they finish.
pub struct ParallelDispatcher {
   region: Arc<ResultRegion>,
   workers: rayon::ThreadPool,
   tickets: SemHandle,
   results: MailboxHandle,
}

impl ParallelDispatcher {
   pub fn new(region: Arc<ResultRegion>, workers: usize) -> EngineResult<ParallelDispatcher> {
      let workers = workers.max(1);
      let pool = rayon::ThreadPoolBuilder::new()
         .num_threads(workers)
         .thread_name(|i| format!("search-worker-{}", i))
         .build()
         .map_err(|e| EngineError::WorkerPool { message: e.to_string() })?;
      let tickets = region.semaphores().allocate(workers)?;
      let results = region.acquire()?;
      debug!("parallel dispatcher ready with {} workers", workers);
      Ok(ParallelDispatcher {
         region,
         workers: pool,
         tickets,
         results,
      })
   }

   pub fn workers(&self) -> usize {
      self.workers.current_num_threads()
   }

   pub fn search(&mut self, root: &RootSearch) -> EngineResult<SearchOutcome> {
      if root.candidates.is_empty() {
         return Err(EngineError::NoCandidates);
      }
      let this = &*self;
      thread::scope(|scope| {
         scope.spawn(|| this.fan_out(root));

         let mut collector = Collector::new(root.mover);
         for _ in 0..root.candidates.len() {
            let result = this.region.receive(this.results)?;
            trace!(
               "candidate {} scored {} after {} positions",
               result.candidate,
               result.score,
               result.positions_explored
            );
            collector.offer(result);
         }
         collector.finish()
      })
   }

   fn fan_out(&self, root: &RootSearch) {
      let semaphores = self.region.semaphores();
      for candidate in 0..root.candidates.len() {
         semaphores.wait(self.tickets);
         let job = root.job(candidate);
         let region = Arc::clone(&self.region);
         let (tickets, results) = (self.tickets, self.results);
         self.workers.spawn(move || {
            let result = job.run();
            if let Err(e) = region.send(results, result) {
               error!("search worker could not report candidate {}: {}", job.candidate, e);
            }
            region.semaphores().signal(tickets);
         });
      }
   }
}

impl Drop for ParallelDispatcher {
   fn drop(&mut self) {
      if let Err(e) = self.region.release(self.results) {
         warn!("failed to release result mailbox: {}", e);
      }
   }
}

pub enum Dispatcher {
   Sequential,
   Parallel(ParallelDispatcher),
}

impl Dispatcher {
   pub fn search(&mut self, root: &RootSearch) -> EngineResult<SearchOutcome> {
      match self {
         Dispatcher::Sequential => sequential_search(root),
         Dispatcher::Parallel(parallel) => parallel.search(root),
      }
   }

   pub fn name(&self) -> &'static str {
      match self {
         Dispatcher::Sequential => "sequential",
         Dispatcher::Parallel(_) => "parallel",
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::error::IpcError;
   use crate::eval::evaluate;
   use rand::prelude::*;
   use std::sync::mpsc;
   use std::time::Duration;

   fn parallel(workers: usize) -> ParallelDispatcher {
      ParallelDispatcher::new(Arc::new(ResultRegion::with_capacity(100, 2)), workers).unwrap()
   }

   fn root<'a>(candidates: &'a [Cell], board: BoardState, depth: u32, mover: Colour, weights: Weights) -> RootSearch<'a> {
      RootSearch {
         candidates,
         board,
         depth,
         mover,
         weights,
      }
   }

   #[test]
   fn opening_at_depth_one_is_the_immediate_differential() {
      let board = BoardState::from_start();
      let moves = board.legal_moves(Colour::Black);
      assert_eq!(moves.len(), 4);
      let search = root(&moves.cells, board, 1, Colour::Black, Weights::PLAIN);

      // by hand: the best (lowest) differential after each of black's four openings
      let direct: Vec<Score> = moves
         .cells
         .iter()
         .map(|cell| evaluate(&board.apply_move(*cell, Colour::Black).board, false, &Weights::PLAIN))
         .collect();
      let best_score = *direct.iter().min().unwrap();
      let best_index = direct.iter().position(|x| *x == best_score).unwrap();
      assert_eq!(best_score, -3);

      for outcome in [sequential_search(&search).unwrap(), parallel(2).search(&search).unwrap()] {
         assert_eq!(outcome.score, best_score);
         assert_eq!(outcome.best, best_index);
         assert_eq!(moves.cells[outcome.best], 20);
         assert_eq!(outcome.positions_explored, 4);
      }
   }

   #[test]
   fn parallel_matches_sequential() {
      let mut rng = StdRng::seed_from_u64(42);
      let mut dispatcher = parallel(3);
      for plies in [0, 4, 9, 20, 33, 47, 55] {
         let board = BoardState::from_random_playout(&mut rng, plies);
         for mover in [Colour::Black, Colour::White] {
            let moves = board.legal_moves(mover);
            if moves.is_empty() {
               continue;
            }
            for depth in 1..=4 {
               for weights in [Weights::PLAIN, Weights::CORNERS] {
                  let search = root(&moves.cells, board, depth, mover, weights);
                  assert_eq!(
                     dispatcher.search(&search).unwrap(),
                     sequential_search(&search).unwrap(),
                     "depth {} {} to move on\n{}",
                     depth,
                     mover,
                     board
                  );
               }
            }
         }
      }
   }

   #[test]
   fn more_candidates_than_workers_and_slots() {
      // enough empty cells around a ring of white discs that black has well over eight moves
      let board: BoardState = "
         ........
         ........
         ..WWWW..
         ..WBBW..
         ..WBBW..
         ..WWWW..
         ........
         ........"
         .parse()
         .unwrap();
      let moves = board.legal_moves(Colour::Black);
      assert!(moves.len() > crate::ipc::MAILBOX_SLOTS);
      let search = root(&moves.cells, board, 3, Colour::Black, Weights::PLAIN);
      let expected = sequential_search(&search).unwrap();
      let mut single = parallel(1);
      assert_eq!(single.search(&search).unwrap(), expected);
      assert_eq!(single.search(&search).unwrap(), expected);
   }

   #[test]
   fn candidates_wait_for_a_ticket() {
      let region = Arc::new(ResultRegion::with_capacity(100, 2));
      let mut dispatcher = ParallelDispatcher::new(Arc::clone(&region), 1).unwrap();
      let tickets = dispatcher.tickets;
      // hold the only ticket so no candidate can reach a worker
      region.semaphores().wait(tickets);

      let (tx, rx) = mpsc::channel();
      let searcher = thread::spawn(move || {
         let board = BoardState::from_start();
         let moves = board.legal_moves(Colour::Black);
         let search = root(&moves.cells, board, 1, Colour::Black, Weights::PLAIN);
         tx.send(dispatcher.search(&search)).unwrap();
      });
      assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());

      region.semaphores().signal(tickets);
      let outcome = rx.recv_timeout(Duration::from_secs(10)).unwrap().unwrap();
      assert_eq!(outcome.score, -3);
      assert_eq!(outcome.best, 0);
      searcher.join().unwrap();
   }

   #[test]
   fn each_side_keeps_its_own_best() {
      let mut rng = StdRng::seed_from_u64(99);
      for plies in [6, 14, 30] {
         let board = BoardState::from_random_playout(&mut rng, plies);
         for mover in [Colour::Black, Colour::White] {
            let moves = board.legal_moves(mover);
            if moves.len() < 2 {
               continue;
            }
            let search = root(&moves.cells, board, 2, mover, Weights::PLAIN);
            let scores: Vec<Score> = (0..moves.len()).map(|i| search.job(i).run().score).collect();
            let outcome = sequential_search(&search).unwrap();
            let wanted = match mover {
               Colour::White => *scores.iter().max().unwrap(),
               Colour::Black => *scores.iter().min().unwrap(),
            };
            assert_eq!(outcome.score, wanted);
            assert_eq!(outcome.best, scores.iter().position(|x| *x == wanted).unwrap());
         }
      }
   }

   #[test]
   fn empty_candidate_list() {
      let search = root(&[], BoardState::from_start(), 2, Colour::Black, Weights::PLAIN);
      assert_eq!(sequential_search(&search), Err(EngineError::NoCandidates));
      assert_eq!(parallel(1).search(&search), Err(EngineError::NoCandidates));
   }

   #[test]
   fn dispatcher_gives_its_mailbox_back() {
      let region = Arc::new(ResultRegion::with_capacity(100, 1));
      let first = ParallelDispatcher::new(Arc::clone(&region), 1).unwrap();
      assert!(matches!(
         ParallelDispatcher::new(Arc::clone(&region), 1),
         Err(EngineError::Ipc(IpcError::CapacityExceeded { resource: "mailbox", .. }))
      ));
      drop(first);
      assert!(ParallelDispatcher::new(region, 1).is_ok());
   }
}
