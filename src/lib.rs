// ghtally library.
// Incremental GitHub profile statistics with a crash-safe lines-of-code cache.

pub mod cache;
pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod github;
pub mod guard;
pub mod history;
pub mod render;

pub use error::{Result, StatError};
