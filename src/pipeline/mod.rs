// src/pipeline/mod.rs

//! Poll pipeline.
//!
//! - `cycle`: fetch and normalize one feed
//! - `engine`: decide what an event does to the board and the logs
//! - `runner`: schedule cycles until stopped

pub mod cycle;
pub mod engine;
pub mod runner;

pub use cycle::{AlertCycle, Cycle, InfoCycle};
pub use engine::{AlertEngine, InfoEngine, Outcome};
pub use runner::{Runner, StopSignal, listen_for_stop};
