//! Token artifact persistence

mod file;

pub use file::FileTokenRepository;
