pub mod cli;
pub mod commands;
pub mod error;
pub mod heatmap;
pub mod logging;
pub mod source;
pub mod tui;

pub use error::{Error, Result};
