//! Build output directory.

use std::fs;
use std::path::Path;

use tracing::{debug, error};

use crate::error::HarnessError;

/// Create `dir` and any missing ancestors. Existing directories are left alone.
///
/// Returns `true` if the directory had to be created.
pub fn ensure_build_dir(dir: &Path) -> Result<bool, HarnessError> {
    if dir.is_dir() {
        debug!(dir = %dir.display(), "build directory present");
        return Ok(false);
    }
    fs::create_dir_all(dir).map_err(|source| {
        error!(dir = %dir.display(), err = %source, "failed to create build directory");
        HarnessError::BuildDirectory {
            path: dir.to_path_buf(),
            source,
        }
    })?;
    debug!(dir = %dir.display(), "build directory created");
    Ok(true)
}
