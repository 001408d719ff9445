mod game;
mod human;
mod render;

use game::{Game, Player, Players};
use log::{error, info};
use paro_lib::config::EngineConfig;
use paro_lib::engine;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::mpsc;
use std::thread;
use structopt::StructOpt;

/// Reversi against a parallel alpha-beta search
#[derive(StructOpt, Debug, Default)]
#[structopt(name = "paro")]
struct Opt {
   /// JSON file of engine settings; flags below override it
   #[structopt(long = "config", parse(from_os_str))]
   config: Option<PathBuf>,
   /// Plies to search on the first move
   #[structopt(short = "d", long = "depth")]
   depth: Option<u32>,
   /// Deepest the search is ever allowed to go
   #[structopt(long = "max-ply")]
   max_ply: Option<u32>,
   /// Seconds the computer should spend on a move
   #[structopt(long = "time-per-move")]
   time_per_move: Option<u64>,
   /// Search candidates one at a time on a single thread
   #[structopt(long = "sequential")]
   sequential: bool,
   /// Number of search worker threads
   #[structopt(short = "j", long = "workers")]
   workers: Option<usize>,
   /// Weight corners above other cells
   #[structopt(long = "corners")]
   corners: bool,
   /// Let the computer play both sides
   #[structopt(long = "self-play")]
   self_play: bool,
   /// Play white instead of black
   #[structopt(long = "play-white")]
   play_white: bool,
}

impl Opt {
   fn players(&self) -> Players {
      match (self.self_play, self.play_white) {
         (true, _) => Players {
            black: Player::Computer,
            white: Player::Computer,
         },
         (false, true) => Players {
            black: Player::Computer,
            white: Player::Human,
         },
         (false, false) => Players {
            black: Player::Human,
            white: Player::Computer,
         },
      }
   }

   fn apply(&self, config: &mut EngineConfig) {
      if let Some(depth) = self.depth {
         config.initial_depth = depth;
      }
      if let Some(max_ply) = self.max_ply {
         config.max_ply = max_ply;
      }
      if let Some(time_per_move) = self.time_per_move {
         config.time_per_move = time_per_move;
      }
      if self.sequential {
         config.parallel = false;
      }
      if let Some(workers) = self.workers {
         config.workers = workers;
      }
      if self.corners {
         config.corner_scores = true;
      }
   }
}

fn load_config(opt: &Opt) -> Result<EngineConfig, String> {
   let mut config = match opt.config {
      Some(ref path) => {
         let text = fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
         parse_config(&text).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?
      }
      None => EngineConfig::default(),
   };
   opt.apply(&mut config);
   Ok(config)
}

fn parse_config(text: &str) -> Result<EngineConfig, serde_json::Error> {
   serde_json::from_str(text)
}

fn main() {
   pretty_env_logger::init();
   let opt = Opt::from_args();

   let config = match load_config(&opt) {
      Ok(config) => config,
      Err(e) => {
         error!("{}", e);
         process::exit(1);
      }
   };
   info!("{:?}", config);

   let (ite_tx, ite_rx) = mpsc::channel(); // Interface to Engine
   let (eti_tx, eti_rx) = mpsc::channel(); // Engine to Interface
   thread::spawn(move || {
      engine::start(config, ite_rx, eti_tx);
   });

   let stdin = io::stdin();
   let stdout = io::stdout();
   let mut game = Game::new(opt.players(), ite_tx, eti_rx, stdin.lock(), stdout.lock());
   if let Err(e) = game.run() {
      error!("{}", e);
      process::exit(1);
   }
}
