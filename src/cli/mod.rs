pub mod collect;
pub mod commands;
pub mod progress;
pub mod summary;

pub use commands::{Cli, Commands};
