// File: src/background/revival/mod.rs

//! Revival job
//!
//! Re-adds lists that still have free indices to the active set.

pub mod job;
pub mod logic;

pub use job::RevivalJob;
pub use logic::revive_lists;
