use smallvec::SmallVec;
use std::fmt::{self, Write};
use std::str::FromStr;

pub const MAX_X: usize = 8;
pub const MAX_Y: usize = 8;
pub const CELLS: usize = MAX_X * MAX_Y;

// every cell index is a bit position in a u64
const _: () = assert!(u64::BITS as usize == CELLS);

const NORTH: usize = 0;
const SOUTH: usize = 1;
const EAST: usize = 2;
const WEST: usize = 3;
const NORTH_EAST: usize = 4;
const NORTH_WEST: usize = 5;
const SOUTH_EAST: usize = 6;
const SOUTH_WEST: usize = 7;

const STEPS: [(i8, i8); 8] = {
   let mut steps = [(0, 0); 8];
   steps[NORTH] = (0, 1);
   steps[SOUTH] = (0, -1);
   steps[EAST] = (1, 0);
   steps[WEST] = (-1, 0);
   steps[NORTH_EAST] = (1, 1);
   steps[NORTH_WEST] = (-1, 1);
   steps[SOUTH_EAST] = (1, -1);
   steps[SOUTH_WEST] = (-1, -1);
   steps
};

const OFFSETS: [i8; 8] = gen_offsets();

/// For each direction and origin cell, every cell the ray passes through before leaving the board.
const RAYS: [[u64; CELLS]; 8] = gen_rays();

const fn gen_offsets() -> [i8; 8] {
   let mut array = [0; 8];

   let mut dir = 0;
   while dir < 8 {
      array[dir] = STEPS[dir].1 * MAX_X as i8 + STEPS[dir].0;
      dir += 1;
   }
   array
}

const fn gen_rays() -> [[u64; CELLS]; 8] {
   let mut array: [[u64; CELLS]; 8] = [[0; CELLS]; 8];

   let mut dir = 0;
   while dir < 8 {
      let (dx, dy) = STEPS[dir];
      let mut cell = 0;
      while cell < CELLS {
         let mut x = (cell % MAX_X) as i8 + dx;
         let mut y = (cell / MAX_X) as i8 + dy;
         let mut ray = 0;
         while x >= 0 && x < MAX_X as i8 && y >= 0 && y < MAX_Y as i8 {
            ray |= 1u64 << (y as u32 * MAX_X as u32 + x as u32);
            x += dx;
            y += dy;
         }
         array[dir][cell] = ray;
         cell += 1;
      }
      dir += 1;
   }
   array
}

pub const CORNERS: [Cell; 4] = [0, 7, 56, 63];

/// A board cell, 0 (a1) through 63 (h8), row-major.
pub type Cell = u8;

pub type MoveList = SmallVec<[Cell; 32]>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Colour {
   Black,
   White,
}

impl Colour {
   pub fn name(self) -> &'static str {
      match self {
         Colour::Black => "black",
         Colour::White => "white",
      }
   }
}

impl std::ops::Not for Colour {
   type Output = Colour;
   fn not(self) -> Colour {
      match self {
         Colour::Black => Colour::White,
         Colour::White => Colour::Black,
      }
   }
}

impl fmt::Display for Colour {
   fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      f.write_str(self.name())
   }
}

/// Two parallel bitsets. A `colour` bit is set for a white disc and only means something where
/// the matching `occupied` bit is set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BoardState {
   pub occupied: u64,
   pub colour: u64,
}

/// Outcome of placing a disc. `captured` holds the opponent discs flipped by the placement (the
/// placed cell itself is not included); an empty set means the move was illegal and `board` is
/// the untouched original.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
   pub board: BoardState,
   pub captured: u64,
}

impl Placement {
   pub fn is_legal(&self) -> bool {
      self.captured != 0
   }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LegalMoves {
   pub set: u64,
   /// Same cells as `set`, in increasing index order
   pub cells: MoveList,
}

impl LegalMoves {
   pub fn is_empty(&self) -> bool {
      self.set == 0
   }

   pub fn len(&self) -> usize {
      self.cells.len()
   }

   pub fn contains(&self, cell: Cell) -> bool {
      (cell as usize) < CELLS && self.set & (1 << cell) != 0
   }
}

impl BoardState {
   pub const fn empty() -> BoardState {
      BoardState { occupied: 0, colour: 0 }
   }

   /// d4 and e5 black, d5 and e4 white.
   pub fn from_start() -> BoardState {
      let mut board = BoardState::empty();
      board.set(27, Colour::Black);
      board.set(36, Colour::Black);
      board.set(28, Colour::White);
      board.set(35, Colour::White);
      board
   }

   /// Plays `plies` random legal moves from the start, passing whenever the side to move can't.
   #[cfg(test)]
   pub fn from_random_playout<R: rand::Rng>(rng: &mut R, plies: usize) -> BoardState {
      use rand::seq::SliceRandom;

      let mut board = BoardState::from_start();
      let mut mover = Colour::Black;
      for _ in 0..plies {
         let moves = board.legal_moves(mover);
         if let Some(cell) = moves.cells.choose(rng) {
            board = board.apply_move(*cell, mover).board;
         }
         mover = !mover;
      }
      board
   }

   pub fn discs(&self, colour: Colour) -> u64 {
      match colour {
         Colour::White => self.occupied & self.colour,
         Colour::Black => self.occupied & !self.colour,
      }
   }

   pub fn colour_at(&self, cell: Cell) -> Option<Colour> {
      let bit = 1u64 << cell;
      if self.occupied & bit == 0 {
         None
      } else if self.colour & bit != 0 {
         Some(Colour::White)
      } else {
         Some(Colour::Black)
      }
   }

   pub fn set(&mut self, cell: Cell, colour: Colour) {
      let bit = 1u64 << cell;
      self.occupied |= bit;
      match colour {
         Colour::White => self.colour |= bit,
         Colour::Black => self.colour &= !bit,
      }
   }

   pub fn count(&self, colour: Colour) -> u32 {
      self.discs(colour).count_ones()
   }

   pub fn empty_cells(&self) -> u32 {
      self.occupied.count_zeros()
   }

   pub fn is_full(&self) -> bool {
      self.occupied == u64::MAX
   }

   /// White discs minus black discs.
   pub fn disc_difference(&self) -> i32 {
      self.count(Colour::White) as i32 - self.count(Colour::Black) as i32
   }

   /// Same discs, every colour swapped.
   pub fn inverted(&self) -> BoardState {
      BoardState {
         occupied: self.occupied,
         colour: !self.colour & self.occupied,
      }
   }

   fn flips_towards(dir: usize, cell: Cell, own: u64, theirs: u64) -> u64 {
      let ray = RAYS[dir][cell as usize];
      let offset = OFFSETS[dir];
      let mut run = 0;
      let mut next = cell as i8 + offset;
      // the ray mask stops a step from wrapping onto the neighbouring row or column
      while (0..CELLS as i8).contains(&next) && ray & (1 << next) != 0 {
         let bit = 1u64 << next;
         if theirs & bit != 0 {
            run |= bit;
         } else if own & bit != 0 {
            return run;
         } else {
            return 0;
         }
         next += offset;
      }
      0
   }

   /// The discs `mover` would flip by playing `cell`, across all eight rays.
   pub fn captures(&self, cell: Cell, mover: Colour) -> u64 {
      if self.occupied & (1 << cell) != 0 {
         return 0;
      }
      let own = self.discs(mover);
      let theirs = self.discs(!mover);
      let mut captured = 0;
      for dir in 0..8 {
         captured |= BoardState::flips_towards(dir, cell, own, theirs);
      }
      captured
   }

   #[must_use]
   pub fn apply_move(&self, cell: Cell, mover: Colour) -> Placement {
      let captured = self.captures(cell, mover);
      if captured == 0 {
         return Placement {
            board: *self,
            captured,
         };
      }
      let changed = captured | (1 << cell);
      let occupied = self.occupied | changed;
      let colour = match mover {
         Colour::White => self.colour | changed,
         Colour::Black => self.colour & !changed,
      };
      Placement {
         board: BoardState { occupied, colour },
         captured,
      }
   }

   pub fn legal_moves(&self, mover: Colour) -> LegalMoves {
      let mut moves = LegalMoves::default();
      let mut empties = !self.occupied;
      while empties != 0 {
         let cell = pop_lsb(&mut empties) as Cell;
         if self.captures(cell, mover) != 0 {
            moves.set |= 1 << cell;
            moves.cells.push(cell);
         }
      }
      moves
   }

   pub fn has_legal_move(&self, mover: Colour) -> bool {
      let mut empties = !self.occupied;
      while empties != 0 {
         if self.captures(pop_lsb(&mut empties) as Cell, mover) != 0 {
            return true;
         }
      }
      false
   }
}

fn pop_lsb(board: &mut u64) -> u32 {
   let lsb = board.trailing_zeros();
   *board &= *board - 1;
   lsb
}

impl fmt::Display for BoardState {
   fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      for y in (0..MAX_Y).rev() {
         for x in 0..MAX_X {
            let c = match self.colour_at((y * MAX_X + x) as Cell) {
               Some(Colour::Black) => 'B',
               Some(Colour::White) => 'W',
               None => '.',
            };
            f.write_char(c)?;
         }
         f.write_char('\n')?;
      }
      Ok(())
   }
}

/// Eight rows of `B`, `W` or `.`, the top row (8) first. Whitespace around rows is ignored.
impl FromStr for BoardState {
   type Err = String;

   fn from_str(s: &str) -> Result<BoardState, String> {
      let rows: Vec<&str> = s.lines().map(str::trim).filter(|x| !x.is_empty()).collect();
      if rows.len() != MAX_Y {
         return Err(format!("expected {} rows in board diagram, found {}", MAX_Y, rows.len()));
      }
      let mut board = BoardState::empty();
      for (i, row) in rows.iter().enumerate() {
         if row.len() != MAX_X {
            return Err(format!("row {} has {} cells, expected {}", MAX_Y - i, row.len(), MAX_X));
         }
         let y = MAX_Y - 1 - i;
         for (x, b) in row.bytes().enumerate() {
            let cell = (y * MAX_X + x) as Cell;
            match b {
               b'B' => board.set(cell, Colour::Black),
               b'W' => board.set(cell, Colour::White),
               b'.' => (),
               other => return Err(format!("unexpected {:?} in board diagram", other as char)),
            }
         }
      }
      Ok(board)
   }
}

pub fn cell_name(cell: Cell) -> String {
   let mut name = String::with_capacity(2);
   name.push((b'a' + cell % MAX_X as u8) as char);
   name.push((b'1' + cell / MAX_X as u8) as char);
   name
}

pub fn parse_cell(name: &str) -> Result<Cell, String> {
   let bytes = name.as_bytes();
   if bytes.len() != 2 {
      return Err(format!("{} is not a valid cell; expected a file and a row, like d3", name));
   }
   let col = match bytes[0] {
      b @ b'a'..=b'h' => b - b'a',
      file => return Err(format!("{} is not a valid file, expected a..=h", file as char)),
   };
   let row = match bytes[1] {
      b @ b'1'..=b'8' => b - b'1',
      rank => return Err(format!("{} is not a valid row, expected 1..=8", rank as char)),
   };
   Ok(row * MAX_X as u8 + col)
}

#[cfg(test)]
mod tests {
   use super::*;

   fn cells(names: &[&str]) -> u64 {
      names.iter().fold(0, |acc, x| acc | 1 << parse_cell(x).unwrap())
   }

   fn fixture(white: &[&str], black: &[&str]) -> BoardState {
      let mut board = BoardState::empty();
      for name in white {
         board.set(parse_cell(name).unwrap(), Colour::White);
      }
      for name in black {
         board.set(parse_cell(name).unwrap(), Colour::Black);
      }
      board
   }

   #[test]
   fn cell_names() {
      assert_eq!(parse_cell("a1"), Ok(0));
      assert_eq!(parse_cell("h1"), Ok(7));
      assert_eq!(parse_cell("d4"), Ok(27));
      assert_eq!(parse_cell("h8"), Ok(63));
      assert!(parse_cell("i1").is_err());
      assert!(parse_cell("a9").is_err());
      assert!(parse_cell("a").is_err());
      for cell in 0..CELLS as Cell {
         assert_eq!(parse_cell(&cell_name(cell)), Ok(cell));
      }
   }

   #[test]
   fn diagram_matches_start() {
      let board: BoardState = "
         ........
         ........
         ........
         ...WB...
         ...BW...
         ........
         ........
         ........"
         .parse()
         .unwrap();
      assert_eq!(board, BoardState::from_start());
      assert_eq!(board.to_string().parse::<BoardState>(), Ok(board));
   }

   #[test]
   fn start_legal_moves() {
      let board = BoardState::from_start();
      let black = board.legal_moves(Colour::Black);
      assert_eq!(black.set, cells(&["e3", "f4", "c5", "d6"]));
      assert_eq!(&black.cells[..], &[20, 29, 34, 43]);
      let white = board.legal_moves(Colour::White);
      assert_eq!(&white.cells[..], &[19, 26, 37, 44]);
   }

   #[test]
   fn replies_after_first_move() {
      let board = BoardState::from_start().apply_move(20, Colour::Black).board;
      let white = board.legal_moves(Colour::White);
      assert_eq!(white.set, cells(&["d3", "f3", "f5"]));
      assert_eq!(&white.cells[..], &[19, 21, 37]);
   }

   #[test]
   fn captures_along_each_ray() {
      // (direction, white run, closing black disc), all played by black on d4
      let cases: [(&str, [&str; 2], &str); 8] = [
         ("north", ["d5", "d6"], "d7"),
         ("south", ["d3", "d2"], "d1"),
         ("east", ["e4", "f4"], "g4"),
         ("west", ["c4", "b4"], "a4"),
         ("north east", ["e5", "f6"], "g7"),
         ("north west", ["c5", "b6"], "a7"),
         ("south east", ["e3", "f2"], "g1"),
         ("south west", ["c3", "b2"], "a1"),
      ];
      for (dir, run, closer) in cases.iter() {
         let board = fixture(run, &[*closer]);
         let placement = board.apply_move(27, Colour::Black);
         assert!(placement.is_legal(), "{}", dir);
         assert_eq!(placement.captured, cells(run), "{}", dir);
         assert_eq!(placement.board.count(Colour::Black), 4, "{}", dir);
         assert_eq!(placement.board.count(Colour::White), 0, "{}", dir);
         assert_eq!(placement.board.colour_at(27), Some(Colour::Black), "{}", dir);
      }
   }

   #[test]
   fn captures_in_several_directions_at_once() {
      let board = fixture(&["d5", "e4", "f4", "c3"], &["d6", "g4", "b2", "c4"]);
      let placement = board.apply_move(27, Colour::Black);
      assert_eq!(placement.captured, cells(&["d5", "e4", "f4", "c3"]));
      assert_eq!(placement.board.count(Colour::White), 0);
   }

   #[test]
   fn rays_do_not_wrap() {
      // each of these would capture if the scan ran off one row onto the next
      let wraps = [
         ("h4", fixture(&["a5"], &["b5"])),
         ("a5", fixture(&["h4"], &["g4"])),
         ("h3", fixture(&["a5"], &["b6"])),
         ("a6", fixture(&["h4"], &["g3"])),
         ("a4", fixture(&["h4"], &["g5"])),
      ];
      for (cell, board) in wraps.iter() {
         let placement = board.apply_move(parse_cell(cell).unwrap(), Colour::Black);
         assert!(!placement.is_legal(), "{}", cell);
         assert_eq!(placement.board, *board, "{}", cell);
      }
   }

   #[test]
   fn run_reaching_the_edge_captures_nothing() {
      let board = fixture(&["b1", "c1", "d1", "e1", "f1", "g1", "h1"], &[]);
      assert!(!board.apply_move(0, Colour::Black).is_legal());
      let board = fixture(&["a2", "a3", "a4", "a5", "a6", "a7", "a8"], &[]);
      assert!(!board.apply_move(0, Colour::Black).is_legal());
   }

   #[test]
   fn gap_breaks_a_run() {
      let board = fixture(&["e4"], &["g4"]);
      assert!(!board.apply_move(27, Colour::Black).is_legal());
   }

   #[test]
   fn occupied_cell_is_never_legal() {
      let board = BoardState::from_start();
      for cell in [27, 28, 35, 36] {
         assert!(!board.apply_move(cell, Colour::Black).is_legal());
         assert!(!board.apply_move(cell, Colour::White).is_legal());
      }
   }

   #[test]
   fn inverted_swaps_colours() {
      let board = BoardState::from_start().apply_move(20, Colour::Black).board;
      let inverted = board.inverted();
      assert_eq!(inverted.count(Colour::White), board.count(Colour::Black));
      assert_eq!(inverted.count(Colour::Black), board.count(Colour::White));
      assert_eq!(inverted.inverted(), board);
      assert_eq!(inverted.disc_difference(), -board.disc_difference());
   }

   #[test]
   fn full_board() {
      let mut board = BoardState::empty();
      for cell in 0..CELLS as Cell {
         board.set(cell, if cell % 2 == 0 { Colour::White } else { Colour::Black });
      }
      assert!(board.is_full());
      assert_eq!(board.empty_cells(), 0);
      assert_eq!(board.disc_difference(), 0);
      assert!(!board.has_legal_move(Colour::White));
      assert!(board.legal_moves(Colour::Black).is_empty());
   }
}
