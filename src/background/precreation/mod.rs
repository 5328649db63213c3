// File: src/background/precreation/mod.rs

//! List precreation job

pub mod job;
pub mod logic;

pub use job::PrecreationJob;
pub use logic::check_precreation;
