//! scriptbridge command line runner
//!
//! Library half of the `scriptbridge` binary, exposed so the commands can be
//! unit tested without spawning a process.

pub mod commands;
pub mod common;
pub mod session;
