use crate::eval::Weights;
use crate::ipc::host_concurrency;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine settings. Every field has a default, so a config file only needs the ones it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
   /// Plies searched on the first decision, before any time-based adjustment
   pub initial_depth: u32,
   pub max_ply: u32,
   /// Seconds a decision should take
   pub time_per_move: u64,
   pub parallel: bool,
   pub workers: usize,
   pub corner_scores: bool,
}

impl Default for EngineConfig {
   fn default() -> EngineConfig {
      EngineConfig {
         initial_depth: 6,
         max_ply: 14,
         time_per_move: 10,
         parallel: true,
         workers: host_concurrency(),
         corner_scores: false,
      }
   }
}

impl EngineConfig {
   pub fn weights(&self) -> Weights {
      if self.corner_scores {
         Weights::CORNERS
      } else {
         Weights::PLAIN
      }
   }

   pub fn move_budget(&self) -> Duration {
      Duration::from_secs(self.time_per_move)
   }
}
