//! The decision policy: remove, save or leave a file untouched.
//!
//! Rules are evaluated in a fixed order and the first one that applies
//! wins. Trash-can containment comes before anything else, and the size
//! limit is consulted only after every rule that allows destruction, so a
//! huge temporary file is still destroyed.

use crate::helpers::{
    contains_path, file_name, has_ignored_extension, is_exception, is_hidden, matches_pattern,
};
use crate::models::{AbsolutePath, Config, Disposition, PERSONAL_CONF_FILE};
use std::fs;

fn is_personal_config_file(path: &str, home: &str) -> bool {
    path.strip_prefix(home)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|rest| rest == PERSONAL_CONF_FILE)
}

fn is_empty_file(path: &str) -> bool {
    match fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.len() == 0,
        Err(_) => false,
    }
}

/// An unreadable size counts as too large.
fn is_too_large(path: &str, limit: u64) -> bool {
    if limit == 0 {
        return false;
    }
    match fs::symlink_metadata(path) {
        Ok(meta) => meta.len() >= limit,
        Err(_) => true,
    }
}

fn is_protected(path: &str, config: &Config) -> bool {
    let settings = &config.settings;
    let uncovered = config.uncovered_dirs.as_deref();

    (contains_path(path, Some(&settings.unremovable_dirs))
        && !contains_path(path, uncovered)
        && !is_exception(path, Some(&settings.exceptions)))
        || (settings.libtrash_config_file_unremovable
            && is_personal_config_file(path, &config.home))
}

fn is_disposable(path: &str, config: &Config) -> bool {
    let settings = &config.settings;

    (settings.ignore_hidden && is_hidden(path))
        || (settings.ignore_editor_backup && path.ends_with('~'))
        || (settings.ignore_editor_temporary && file_name(path).starts_with('#'))
        || contains_path(path, Some(&settings.temporary_dirs))
        || contains_path(path, Some(&config.user_temporary_dirs))
        || (!settings.global_protection && !contains_path(path, Some(&config.home)))
        || has_ignored_extension(path, &settings.ignore_extensions)
        || (!settings.ignore_re.is_empty() && matches_pattern(path, &settings.ignore_re))
        || contains_path(path, Some(&settings.removable_media_mount_points))
        || is_empty_file(path)
}

/// Decides what should happen to `path` before a destructive operation.
///
/// Reads file metadata but never modifies anything.
pub fn decide_action(path: &AbsolutePath, config: &Config) -> Disposition {
    let text = path.as_str();

    let disposition = if contains_path(text, Some(&config.absolute_trash_can)) {
        if !config.settings.protect_trash || contains_path(text, config.uncovered_dirs.as_deref())
        {
            Disposition::Remove
        } else {
            Disposition::LeaveUntouched
        }
    } else if is_protected(text, config) {
        Disposition::LeaveUntouched
    } else if is_disposable(text, config) {
        Disposition::Remove
    } else if is_too_large(text, config.settings.preserve_files_larger_than_limit) {
        Disposition::LeaveUntouched
    } else {
        Disposition::Save
    };

    tracing::debug!(path = %text, %disposition, "decided");
    disposition
}
