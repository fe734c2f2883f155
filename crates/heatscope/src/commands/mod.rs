pub mod dump;
pub mod query;
pub mod seed;
pub mod view;

use crate::error::{Error, Result};
use std::path::Path;

/// Fail early with a hint instead of letting SQLite report a bare open error
fn require_database(path: &Path) -> Result<()> {
    if path.is_file() {
        return Ok(());
    }
    Err(Error::InvalidArgument(format!(
        "metrics database {} not found (create one with `heatscope seed`)",
        path.display()
    )))
}
