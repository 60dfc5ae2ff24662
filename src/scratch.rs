// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Scoped scratch space for file based tools.
//!
//! Some external tools cannot work over pipes, e.g., `sqlite3` needs a real
//! database file to dump. Filters that drive such tools stage their data in a
//! [`ScratchDir`]. A scratch directory is given a unique name on creation,
//! and it is removed together with everything inside it once the handle is
//! dropped. Thus, every exit path of a filter cleans up after itself, whether
//! it succeeded, failed, or bailed out early through `?`.

use std::{
    fs,
    path::{Path, PathBuf},
};
use tempfile::{Builder, TempDir};
use tracing::{debug, instrument, warn};

/// Uniquely named private directory that removes itself on drop.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create new scratch directory in the system temporary directory.
    ///
    /// # Errors
    ///
    /// - Return [`ScratchError::Create`] if directory cannot be created.
    pub fn new(prefix: &str) -> Result<Self> {
        Self::new_in(std::env::temp_dir(), prefix)
    }

    /// Create new scratch directory inside of target root directory.
    ///
    /// The directory name starts with `prefix`, followed by a random suffix.
    ///
    /// # Errors
    ///
    /// - Return [`ScratchError::Create`] if directory cannot be created.
    #[instrument(skip(root), level = "debug")]
    pub fn new_in(root: impl AsRef<Path>, prefix: &str) -> Result<Self> {
        let dir = Builder::new()
            .prefix(prefix)
            .tempdir_in(root.as_ref())
            .map_err(|source| ScratchError::Create {
                source,
                root: root.as_ref().to_path_buf(),
            })?;
        debug!("created scratch directory {:?}", dir.path().display());

        Ok(Self { dir })
    }

    /// Absolute path of scratch directory itself.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Reserve path for a file inside of scratch directory.
    ///
    /// Does not create the file. Useful for tools that are expected to create
    /// their own output file.
    pub fn path(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write contents to a file inside of scratch directory.
    ///
    /// # Errors
    ///
    /// - Return [`ScratchError::Write`] if file cannot be written.
    pub fn write(&self, name: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
        let path = self.path(name);
        fs::write(&path, contents.as_ref()).map_err(|source| ScratchError::Write {
            source,
            path: path.clone(),
        })?;

        Ok(path)
    }

    /// Read contents of a file inside of scratch directory.
    ///
    /// # Errors
    ///
    /// - Return [`ScratchError::Read`] if file cannot be read.
    pub fn read(&self, name: impl AsRef<Path>) -> Result<Vec<u8>> {
        let path = self.path(name);
        fs::read(&path).map_err(|source| ScratchError::Read { source, path })
    }

    /// Remove scratch directory now.
    ///
    /// Same as dropping the handle, except that a failed removal is logged
    /// instead of silently ignored.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(error) = self.dir.close() {
            warn!(
                "failed to remove scratch directory {:?}: {error}",
                path.display()
            );
        }
    }
}

/// Scratch space error types.
#[derive(Debug, thiserror::Error)]
pub enum ScratchError {
    /// Scratch directory cannot be created.
    #[error("failed to create scratch directory in {:?}", root.display())]
    Create {
        #[source]
        source: std::io::Error,
        root: PathBuf,
    },

    /// Scratch file cannot be written to.
    #[error("failed to write scratch file {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Scratch file cannot be read from.
    #[error("failed to read scratch file {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = ScratchError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scratch_dir_is_removed_on_drop() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let path = {
            let scratch = ScratchDir::new_in(root.path(), "sqlite_dump-")?;
            scratch.write("in.db", b"data")?;
            assert!(scratch.path("in.db").exists());
            scratch.root().to_path_buf()
        };

        assert!(!path.exists());
        assert_eq!(fs::read_dir(root.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn scratch_dir_is_removed_on_close() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let scratch = ScratchDir::new_in(root.path(), "ziphook-")?;
        scratch.write("in.zip", b"PK")?;
        scratch.close();

        assert_eq!(fs::read_dir(root.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn scratch_dirs_never_collide() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let first = ScratchDir::new_in(root.path(), "sqlite_load-")?;
        let second = ScratchDir::new_in(root.path(), "sqlite_load-")?;

        assert_ne!(first.root(), second.root());
        let name = first
            .root()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        assert!(name.starts_with("sqlite_load-"));
        Ok(())
    }

    #[test]
    fn scratch_read_round_trips_written_bytes() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let scratch = ScratchDir::new_in(root.path(), "sqlite_load-")?;
        scratch.write("in.sql", b"CREATE TABLE t(a);\n")?;

        assert_eq!(scratch.read("in.sql")?, b"CREATE TABLE t(a);\n".to_vec());
        Ok(())
    }

    #[test]
    fn scratch_path_does_not_create_file() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let scratch = ScratchDir::new_in(root.path(), "sqlite_load-")?;
        let path = scratch.path("out.db");

        assert!(!path.exists());
        assert!(matches!(
            scratch.read("out.db"),
            Err(ScratchError::Read { .. })
        ));
        Ok(())
    }
}
