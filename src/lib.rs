//! Bridge to a USI shogi engine running as a child process.
//!
//! [`bridge::Bridge`] is the entry point: connect, handshake, set a
//! position, search, quit. Everything else is the plumbing beneath it.

pub mod banner;
pub mod bridge;
pub mod classifier;
pub mod commands;
pub mod config;
pub mod consts;
pub mod error;
pub mod events;
pub mod process;
pub mod protocol;
pub mod reader;
pub mod result;
pub mod spinner;
pub mod status;
pub mod supervisor;
pub mod writer;
