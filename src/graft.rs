//! Relocation of a file into the trash can, reproducing its original
//! directory structure below the trash root.

use crate::errors::{is_cross_device, CoreError, GraftError};
use crate::fs::FileSystem;
use crate::helpers::contains_path;
use crate::identity::dir_is_usable;
use crate::models::{AbsolutePath, Config};
use crate::movefile::manual_move;
use std::fmt::Write as _;
use std::fs::{self, DirBuilder, Permissions};
use std::io;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};

/// Owner-only rwx for directories created in the trash can.
const TRASH_DIR_MODE: u32 = 0o700;

/// Initial room reserved for the `[n]` suffix; the buffer grows as needed.
const DEF_DIGITS: usize = 3;

/// Bounded re-probing when the directory changes under us.
const MAX_DIR_PROBES: usize = 8;

/// Why a directory in the trash can is not usable.
#[derive(Debug)]
pub enum DirError {
    /// Something else occupies the name, or a directory we cannot fix.
    Collision,
    Io(io::Error),
}

/// Makes sure `path` is a directory the effective identity can write to and
/// search, creating it if nothing is there.
///
/// A lost race between the existence check and `mkdir` is re-probed rather
/// than reported as a failure.
pub fn dir_ok(path: &Path) -> Result<(), DirError> {
    dir_ok_with(path, |path| DirBuilder::new().mode(TRASH_DIR_MODE).create(path))
}

fn dir_ok_with(
    path: &Path,
    mut mkdir: impl FnMut(&Path) -> io::Result<()>,
) -> Result<(), DirError> {
    for _ in 0..MAX_DIR_PROBES {
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == io::ErrorKind::NotFound => match mkdir(path) {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(DirError::Io(err)),
            },
            Err(err) => return Err(DirError::Io(err)),
        };

        if !meta.is_dir() {
            return Err(DirError::Collision);
        }
        if dir_is_usable(path) {
            return Ok(());
        }
        return match fs::set_permissions(path, Permissions::from_mode(TRASH_DIR_MODE)) {
            Ok(()) => Ok(()),
            Err(_) => Err(DirError::Collision),
        };
    }
    Err(DirError::Collision)
}

/// What kind of name the collision resolver is inventing.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum NameKind {
    /// An intermediate directory: an existing usable directory is reused.
    Directory,
    /// The final file name: only an unused name will do.
    File,
}

fn name_is_acceptable(candidate: &str, kind: NameKind) -> bool {
    match fs::symlink_metadata(candidate) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => true,
        Err(_) => false,
        Ok(_) if kind == NameKind::File => false,
        Ok(_) => {
            let path = Path::new(candidate);
            fs::metadata(path).is_ok_and(|meta| meta.is_dir()) && dir_is_usable(path)
        }
    }
}

/// Finds the smallest `n >= 1` such that `"{taken}[{n}]"` is acceptable.
pub fn resolve_collision(taken: &str, kind: NameKind) -> Result<String, GraftError> {
    let mut candidate = String::with_capacity(taken.len() + DEF_DIGITS + 2);
    let suffix = first_free_suffix(|n| {
        candidate.clear();
        candidate.push_str(taken);
        // Writing into a String cannot fail.
        let _ = write!(candidate, "[{n}]");
        name_is_acceptable(&candidate, kind)
    })
    .ok_or_else(|| GraftError::other(taken, "no free collision suffix left"))?;

    tracing::debug!(taken, suffix, ?kind, "resolved name collision");
    Ok(format!("{taken}[{suffix}]"))
}

/// Smallest `n >= 1` accepted by `acceptable`, assuming every value below
/// the first accepted one is rejected.
///
/// Doubles `n` until an acceptable value turns up, then bisects between the
/// last rejected and the first accepted value, so the number of probes is
/// logarithmic in `n`.
fn first_free_suffix(mut acceptable: impl FnMut(u64) -> bool) -> Option<u64> {
    if acceptable(1) {
        return Some(1);
    }

    let mut rejected: u64 = 1;
    let mut accepted: u64 = 2;
    while !acceptable(accepted) {
        rejected = accepted;
        accepted = accepted.checked_mul(2)?;
    }

    while accepted - rejected > 1 {
        let middle = rejected + (accepted - rejected) / 2;
        if acceptable(middle) {
            accepted = middle;
        } else {
            rejected = middle;
        }
    }
    Some(accepted)
}

fn join_segments(root: &str, segments: &[String]) -> String {
    let mut path = String::from(root.trim_end_matches('/'));
    for segment in segments {
        path.push('/');
        path.push_str(segment);
    }
    path
}

/// Moves `source` to `trash_root` + (`source` minus `strip_prefix`),
/// creating the intermediate directories on the way.
///
/// Colliding directory or file names get a `[n]` suffix. A rename that
/// crosses devices falls back to [`manual_move`]. Returns where the file
/// ended up.
pub fn graft(
    filesystem: &dyn FileSystem,
    trash_root: &str,
    source: &AbsolutePath,
    strip_prefix: Option<&str>,
) -> Result<PathBuf, GraftError> {
    let branch = match strip_prefix {
        Some(prefix) => source
            .as_str()
            .strip_prefix(prefix.trim_end_matches('/'))
            .ok_or_else(|| {
                GraftError::other(source.as_path(), "path is outside the stripped prefix")
            })?,
        None => source.as_str(),
    };

    let original: Vec<&str> = branch.split('/').filter(|s| !s.is_empty()).collect();
    if original.is_empty() {
        return Err(GraftError::other(source.as_path(), "nothing to graft"));
    }
    let mut segments: Vec<String> = original.iter().map(|s| s.to_string()).collect();
    let last = segments.len() - 1;

    let mut cursor = 0;
    while cursor < last {
        let dir = join_segments(trash_root, &segments[..=cursor]);
        match dir_ok(Path::new(&dir)) {
            Ok(()) => cursor += 1,
            Err(DirError::Collision) => {
                tracing::debug!(dir = %dir, "directory name collision in trash can");
                let base = join_segments(trash_root, &segments[..cursor]);
                let taken = format!("{}/{}", base, original[cursor]);
                let renamed = resolve_collision(&taken, NameKind::Directory)?;
                segments[cursor] = renamed[base.len() + 1..].to_string();
            }
            Err(DirError::Io(err)) => {
                return Err(GraftError::Other {
                    path: dir.into(),
                    source: err,
                })
            }
        }
    }

    let mut destination = join_segments(trash_root, &segments);
    if fs::symlink_metadata(&destination).is_ok() {
        destination = resolve_collision(&destination, NameKind::File)?;
    }
    let destination = PathBuf::from(destination);

    tracing::debug!(source = %source, destination = %destination.display(), "grafting file");
    match filesystem.rename(source.as_path(), &destination) {
        Ok(()) => Ok(destination),
        Err(CoreError::Io(_, err)) if is_cross_device(&err) => {
            tracing::debug!(source = %source, "rename crosses devices, copying instead");
            manual_move(filesystem, source.as_path(), &destination)?;
            Ok(destination)
        }
        Err(CoreError::Io(_, err)) => Err(GraftError::classify(source.as_path(), err)),
        Err(err) => Err(GraftError::other(source.as_path(), err.to_string())),
    }
}

/// Grafts a file slated for saving into the right part of the trash can:
/// below the trash can relative to `home`, or below the system root with
/// its full path when it lives elsewhere.
pub fn graft_into_trash(
    filesystem: &dyn FileSystem,
    config: &Config,
    source: &AbsolutePath,
) -> Result<PathBuf, GraftError> {
    if contains_path(source.as_str(), Some(&config.home)) {
        return graft(filesystem, &config.absolute_trash_can, source, Some(&config.home));
    }
    match &config.absolute_trash_system_root {
        Some(root) => graft(filesystem, root, source, None),
        None => Err(GraftError::other(
            source.as_path(),
            "file is outside home and global protection is off",
        )),
    }
}
