//! Path and list primitives shared by the policy and the placement code.
//!
//! Directory, exception and extension lists are semicolon-separated strings.
//! The matchers below work on slices of those strings and never allocate.

use crate::errors::CoreError;
use crate::models::AbsolutePath;
use std::env;
use std::fs;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

/// Separator used by every list-valued setting.
pub const LIST_SEPARATOR: char = ';';

/// Returns a user-safe, trimmed path string that can be used in logs and messages.
pub fn sanitize_user_path(path: &Path) -> String {
    path.display().to_string().trim().to_string()
}

/// Human readable size rendering used when printing the configuration.
pub fn print_size(bytes: u64) -> String {
    const SUFFIXES: [&str; 5] = ["B", "K", "M", "G", "T"];
    let mut value = bytes as f64;
    let mut idx = 0usize;

    while value >= 1024.0 && idx < SUFFIXES.len() - 1 {
        value /= 1024.0;
        idx += 1;
    }

    if idx == 0 {
        format!("{:.0} {}", value, SUFFIXES[idx])
    } else {
        format!("{:.1} {}", value, SUFFIXES[idx])
    }
}

/// Non-empty entries of a `;`-separated list.
///
/// Empty entries (`"a;;b"`, a trailing `;`) are dropped on purpose: kept,
/// an empty directory would be a prefix of every path and match everything.
fn list_entries(list: &str) -> impl Iterator<Item = &str> {
    list.split(LIST_SEPARATOR).filter(|entry| !entry.is_empty())
}

/// True iff `path` lies strictly below one of the directories in `dir_list`.
///
/// The match must end on a segment boundary: `/a/b` covers `/a/b/c` but not
/// `/a/bc`, and not `/a/b` itself. Trailing slashes on list entries are
/// ignored, so `/` covers every absolute path.
pub fn contains_path(path: &str, dir_list: Option<&str>) -> bool {
    let Some(dir_list) = dir_list else {
        return false;
    };

    list_entries(dir_list).any(|entry| {
        let dir = entry.trim_end_matches('/');
        path.len() > dir.len()
            && path.starts_with(dir)
            && path.as_bytes()[dir.len()] == b'/'
    })
}

/// True iff `path` begins with one of the entries in `exceptions`.
///
/// Plain prefix match with no boundary check, so a single file can be
/// listed.
pub fn is_exception(path: &str, exceptions: Option<&str>) -> bool {
    exceptions.is_some_and(|list| list_entries(list).any(|entry| path.starts_with(entry)))
}

/// Extension of the final path segment, if it has a non-empty one.
pub fn file_extension(path: &str) -> Option<&str> {
    let dot = path.rfind('.')?;
    if path.rfind('/').is_some_and(|slash| dot < slash) {
        return None;
    }
    let extension = &path[dot + 1..];
    (!extension.is_empty()).then_some(extension)
}

/// True iff the final segment's extension is listed in `extensions`
/// (exact, case-sensitive).
pub fn has_ignored_extension(path: &str, extensions: &str) -> bool {
    match file_extension(path) {
        Some(extension) => list_entries(extensions).any(|entry| entry == extension),
        None => false,
    }
}

/// True iff any segment of a canonical path starts with a dot.
pub fn is_hidden(absolute_path: &str) -> bool {
    absolute_path.contains("/.")
}

/// Regular-expression search against the literal path.
///
/// A pattern that does not compile never matches.
pub fn matches_pattern(path: &str, pattern: &str) -> bool {
    match regex::Regex::new(pattern) {
        Ok(re) => re.is_match(path),
        Err(err) => {
            tracing::debug!(pattern, error = %err, "ignoring invalid IGNORE_RE pattern");
            false
        }
    }
}

/// The final segment of `path`.
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(slash) => &path[slash + 1..],
        None => path,
    }
}

/// Directory holding `path`: `"."` for a bare name, `"/"` for a top-level entry.
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        None => ".",
        Some(0) => "/",
        Some(slash) => &path[..slash],
    }
}

/// Prefixes every entry of a home-relative list with `home`.
pub fn expand_user_dirs(relative_dirs: &str, home: &str) -> String {
    let home = home.trim_end_matches('/');
    list_entries(relative_dirs)
        .map(|entry| format!("{home}/{entry}"))
        .collect::<Vec<_>>()
        .join(";")
}

/// Builds an absolute path for `path`.
///
/// With `follow_final_symlink` and a symlink as the final component, the
/// link is resolved completely. Otherwise only the parent directory is
/// canonicalized and the final component is re-appended untouched: delete
/// and rename act on the link itself, open and truncate on its target.
pub fn canonicalize(path: &Path, follow_final_symlink: bool) -> crate::Result<AbsolutePath> {
    if follow_final_symlink
        && fs::symlink_metadata(path).is_ok_and(|meta| meta.file_type().is_symlink())
    {
        let resolved = fs::canonicalize(path).map_err(|err| CoreError::io(path, err))?;
        return AbsolutePath::try_from(resolved);
    }

    let raw = path
        .to_str()
        .ok_or_else(|| CoreError::invalid_path(sanitize_user_path(path)))?;

    let (dir, name) = match raw.rfind('/') {
        None => (
            env::current_dir().map_err(|err| CoreError::io(".", err))?,
            raw,
        ),
        Some(0) => (PathBuf::from("/"), &raw[1..]),
        Some(slash) => (PathBuf::from(&raw[..slash]), &raw[slash + 1..]),
    };

    let abs_dir = fs::canonicalize(&dir).map_err(|err| CoreError::io(&dir, err))?;
    let abs_dir = abs_dir
        .to_str()
        .ok_or_else(|| CoreError::invalid_path(sanitize_user_path(&abs_dir)))?;

    let mut absolute = String::with_capacity(abs_dir.len() + 1 + name.len());
    absolute.push_str(abs_dir);
    if abs_dir.len() > 1 {
        absolute.push('/');
    }
    absolute.push_str(name);
    AbsolutePath::new(absolute)
}

/// Resolves an "at"-style `(dirfd, path)` pair into a plain path.
///
/// Absolute paths and `AT_FDCWD` come back unchanged; a relative path is
/// joined onto the directory `dirfd` refers to, found via `/proc/self/fd`.
pub fn absolute_from_dirfd(dirfd: RawFd, path: &Path) -> crate::Result<PathBuf> {
    if path.is_absolute() || dirfd == libc::AT_FDCWD {
        return Ok(path.to_path_buf());
    }
    if dirfd < 0 {
        return Err(CoreError::io(
            path,
            std::io::Error::from_raw_os_error(libc::EBADF),
        ));
    }

    let proc_path = PathBuf::from(format!("/proc/self/fd/{dirfd}"));
    let dir = fs::canonicalize(&proc_path)
        .map_err(|_| CoreError::io(&proc_path, std::io::Error::from_raw_os_error(libc::EBADF)))?;
    let meta = fs::metadata(&dir)
        .map_err(|_| CoreError::io(&dir, std::io::Error::from_raw_os_error(libc::EBADF)))?;
    if !meta.is_dir() {
        return Err(CoreError::io(
            &dir,
            std::io::Error::from_raw_os_error(libc::ENOTDIR),
        ));
    }
    Ok(dir.join(path))
}
