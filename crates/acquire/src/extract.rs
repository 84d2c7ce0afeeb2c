//! Tarball extraction.

use flate2::read::GzDecoder;
use std::fs::File;
use std::path::{Component, Path, PathBuf};
use tar::Archive;
use tracing::debug;

/// Unpack a gzip-compressed tarball into `dest`.
///
/// Entries that would escape `dest` are rejected by `tar`.
pub(crate) fn unpack_tar_gz(archive: &Path, dest: &Path) -> std::io::Result<()> {
    debug!(?archive, ?dest, "Unpacking archive");

    let file = File::open(archive)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(true);

    std::fs::create_dir_all(dest)?;
    archive.unpack(dest)
}

/// Locate `relative` inside an unpacked tree.
///
/// Returns `None` if the path is not a plain relative path, is a symlink,
/// resolves outside `root` or does not name a regular file.
pub(crate) fn locate_binary(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative.trim_start_matches("./"));
    let plain = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !plain || relative.as_os_str().is_empty() {
        return None;
    }

    let path = root.join(relative);
    if !std::fs::symlink_metadata(&path).ok()?.is_file() {
        return None;
    }

    // Intermediate directories may still be symlinks
    let root = root.canonicalize().ok()?;
    if !path.canonicalize().ok()?.starts_with(&root) {
        debug!(?path, "Binary resolves outside the archive");
        return None;
    }
    Some(path)
}
