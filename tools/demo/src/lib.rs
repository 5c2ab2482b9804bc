//! Demonstration of checkmem: one call that keeps about 1 MiB alive.
//!
//! The binary registers the tracing allocator, retains memory from a
//! module-level accumulator and prints the delta the measurement saw.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod cli;
pub mod config;
pub mod leak;

pub use cli::Cli;
pub use config::DemoConfig;
