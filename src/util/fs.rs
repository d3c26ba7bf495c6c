//! Filesystem helpers shared by the render and image layers.

use std::{
    fs::File,
    io::{self, ErrorKind},
    path::Path,
};

use tokio::fs;

const STAGING_PREFIX: &str = ".staging-";

/// Move `from` to `to`. The destination name only ever refers to a complete file.
///
/// Across filesystems the contents are copied into a hidden staging file next
/// to `to` and renamed into place, so a failed copy never leaves a partial
/// file under the final name.
pub async fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::CrossesDevices => {
            let from = from.to_path_buf();
            let to = to.to_path_buf();
            tokio::task::spawn_blocking(move || copy_then_persist(&from, &to))
                .await
                .map_err(|err| io::Error::other(format!("move task aborted: {err}")))?
        }
        Err(err) => Err(err),
    }
}

/// Copy `from` into a staging file beside `to`, rename it into place, then drop the source.
///
/// Fails with `AlreadyExists` instead of replacing an existing `to`. The
/// staging file is removed on every error path.
pub(crate) fn copy_then_persist(from: &Path, to: &Path) -> io::Result<()> {
    let parent = to
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut source = File::open(from)?;
    let mut staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempfile_in(parent)?;
    io::copy(&mut source, staged.as_file_mut())?;
    staged.as_file().sync_all()?;

    staged.persist_noclobber(to).map_err(|err| err.error)?;
    std::fs::remove_file(from)
}
