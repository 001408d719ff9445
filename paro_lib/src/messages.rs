use crate::board::{BoardState, Colour};
use crate::engine::Decision;
use crate::error::EngineError;

// Intraprocess Communication Messages

// Interface to Engine
#[derive(Clone, Copy, Debug)]
pub enum InterfaceMessage {
   Go { board: BoardState, mover: Colour }, // Decide a move for mover and respond with it
   SetDepth(u32),
   QueryDepth, // Query the depth the next search will start from
}

// Engine to Interface
#[derive(Clone, Debug)]
pub enum EngineMessage {
   Decided(Decision),
   Failed(EngineError),
   Depth(u32),
}
