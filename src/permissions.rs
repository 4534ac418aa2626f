use std::path::Path;

use tracing::debug;

use crate::capabilities::FileSystem;

/// Adds `x` for every principal that has `r`; write bits and the bits above
/// `0o777` are left as they are.
pub fn executable_mode(mode: u32) -> u32 {
    mode | ((mode & 0o444) >> 2)
}

/// Makes `path` executable for whoever can read it. The file is only
/// touched when its mode actually changes.
pub fn ensure_executable(fs: &dyn FileSystem, path: &Path) -> std::io::Result<()> {
    let mode = fs.mode(path)?;
    let wanted = executable_mode(mode);
    if wanted != mode {
        debug!(path = %path.display(), from = %format!("{:o}", mode & 0o777), to = %format!("{:o}", wanted & 0o777), "fixing permissions");
        fs.set_mode(path, wanted)?;
    }
    Ok(())
}
