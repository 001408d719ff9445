pub mod board;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod eval;
pub mod ipc;
pub mod messages;
pub mod search;
