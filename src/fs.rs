use crate::errors::CoreError;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

/// Real operations the engine calls through to once a decision is made.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum RealOp {
    Unlink,
    Rename,
    Open,
}

impl RealOp {
    pub const ALL: [RealOp; 3] = [RealOp::Unlink, RealOp::Rename, RealOp::Open];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unlink => "unlink",
            Self::Rename => "rename",
            Self::Open => "open",
        }
    }
}

impl fmt::Display for RealOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Boundary to the underlying, non-intercepted file operations.
///
/// Metadata reads and directory creation go straight to `std::fs`; only the
/// operations an interception layer would otherwise recurse into live here.
pub trait FileSystem: Send + Sync {
    /// Whether the real implementation of `op` could be located.
    fn provides(&self, op: RealOp) -> bool {
        let _ = op;
        true
    }

    /// Removes a file (the real `unlink`).
    fn remove_file(&self, path: &Path) -> crate::Result<()>;

    /// Renames/moves a path (the real `rename`).
    fn rename(&self, from: &Path, to: &Path) -> crate::Result<()>;

    /// Opens a file read-only.
    fn open_read(&self, path: &Path) -> crate::Result<Box<dyn Read>>;

    /// Creates or truncates a file for writing.
    ///
    /// Without `follow_final_symlink` a symlink at `path` makes the open
    /// fail with `ELOOP` instead of truncating its target.
    fn open_write(
        &self,
        path: &Path,
        follow_final_symlink: bool,
    ) -> crate::Result<Box<dyn Write>>;
}

/// Default filesystem implementation backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn remove_file(&self, path: &Path) -> crate::Result<()> {
        fs::remove_file(path).map_err(|err| CoreError::io(path, err))
    }

    fn rename(&self, from: &Path, to: &Path) -> crate::Result<()> {
        fs::rename(from, to).map_err(|err| CoreError::io(from, err))
    }

    fn open_read(&self, path: &Path) -> crate::Result<Box<dyn Read>> {
        File::open(path)
            .map(|file| Box::new(file) as Box<dyn Read>)
            .map_err(|err| CoreError::io(path, err))
    }

    fn open_write(
        &self,
        path: &Path,
        follow_final_symlink: bool,
    ) -> crate::Result<Box<dyn Write>> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        if !follow_final_symlink {
            options.custom_flags(libc::O_NOFOLLOW);
        }
        options
            .open(path)
            .map(|file| Box::new(BufWriter::new(file)) as Box<dyn Write>)
            .map_err(|err| CoreError::io(path, err))
    }
}
