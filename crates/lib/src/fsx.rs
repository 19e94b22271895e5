//! Thin filesystem wrappers.
//!
//! No business logic lives here; these exist because the staleness engine and
//! the bootstrap supervisor depend on exact semantics: `exists` is true for
//! directories as well as files, and `rename_overwrite` replaces an existing
//! destination instead of failing.

use std::fs;
use std::io;
use std::path::Path;

/// True if `path` refers to anything at all, file or directory.
pub fn exists(path: &Path) -> bool {
  path.exists()
}

/// True if `path` is a regular file.
pub fn is_file(path: &Path) -> bool {
  path.is_file()
}

/// True if `path` is a directory.
pub fn is_dir(path: &Path) -> bool {
  path.is_dir()
}

/// Copy a regular file, overwriting the destination.
pub fn copy(from: &Path, to: &Path) -> io::Result<()> {
  fs::copy(from, to)?;
  Ok(())
}

/// Rename `from` over `to`, replacing `to` if it exists.
///
/// `std::fs::rename` already replaces files on Unix. On Windows it refuses to,
/// so an existing destination file is removed first. The rename itself stays
/// the final step either way.
pub fn rename_overwrite(from: &Path, to: &Path) -> io::Result<()> {
  #[cfg(windows)]
  if is_file(to) {
    fs::remove_file(to)?;
  }
  fs::rename(from, to)
}

/// Create a directory, including missing parents. Existing directories are fine.
pub fn mkdir(path: &Path) -> io::Result<()> {
  fs::create_dir_all(path)
}

/// Remove `path`, dispatching to file unlink or (empty) directory removal.
pub fn remove(path: &Path) -> io::Result<()> {
  if is_dir(path) {
    fs::remove_dir(path)
  } else {
    fs::remove_file(path)
  }
}
