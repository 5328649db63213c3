// File: src/background/writer/mod.rs

//! Token writer job
//!
//! Regenerates the four published artifacts of every changed list.

pub mod job;
pub mod logic;


pub use job::WriterJob;
pub use logic::{StatusListWriter, WriteSummary, WriterSettings};
