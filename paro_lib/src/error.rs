//! Error types for the engine and its IPC layer
//!
//! Nothing here is retried: pools are sized at build time, so running out of one means the
//! sizing is wrong rather than that a transient fault occurred.

use crate::board::Cell;
use thiserror::Error;

/// Errors raised by the semaphore pool, shared region and mailbox pool
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IpcError {
   /// A fixed-capacity pool has no entries left
   #[error("{resource} pool exhausted (capacity {capacity})")]
   CapacityExceeded { resource: &'static str, capacity: usize },

   /// The primitive does not support this operation
   #[error("{operation} is not supported")]
   Unsupported { operation: &'static str },

   /// A mailbox handle was used after its mailbox went back to the pool
   #[error("mailbox {index} was released; handle is stale")]
   StaleHandle { index: usize },
}

/// Errors surfaced by the search engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
   #[error(transparent)]
   Ipc(#[from] IpcError),

   /// The worker thread pool could not be started
   #[error("Failed to start search workers: {message}")]
   WorkerPool { message: String },

   /// The controller was asked to pick from an empty candidate list
   #[error("No candidate moves to decide between")]
   NoCandidates,

   #[error("{cell} is not a legal move")]
   IllegalMove { cell: Cell },
}

pub type EngineResult<T> = Result<T, EngineError>;
