//! Interception flows for the destructive operations: unlink, rename over
//! an existing file, and open with truncation.
//!
//! Each flow gates on the session, screens out the cases the engine never
//! touches, asks the policy, grafts when told to save, and finally runs the
//! real operation.

use crate::errors::CoreError;
use crate::fs::FileSystem;
use crate::graft::graft_into_trash;
use crate::helpers::{absolute_from_dirfd, canonicalize};
use crate::identity::{can_write_to_dir, WriteAccess};
use crate::models::{Config, Disposition, FailurePolicy, InterceptToggles, OpenCall, Outcome};
use crate::policy::decide_action;
use crate::session::Session;
use std::fs::{self, Metadata, Permissions};
use std::io::{self, Write};
use std::os::raw::c_int;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::io::RawFd;
use std::path::Path;

enum Gate<'s> {
    PassThrough,
    Failed(FailurePolicy),
    Active(&'s Config),
}

/// Only regular files and symlinks are candidates; anything missing, a
/// directory or a special file is left to the real operation.
fn candidate(meta: io::Result<Metadata>) -> Option<Metadata> {
    match meta {
        Ok(meta) if meta.is_file() || meta.file_type().is_symlink() => Some(meta),
        Ok(_) => None,
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::debug!(error = %err, "stat failed, leaving the call alone");
            }
            None
        }
    }
}

/// Runs one intercepted call against a session.
pub struct Interceptor<'a, F: FileSystem> {
    session: Session,
    filesystem: &'a F,
}

impl<'a, F: FileSystem> Interceptor<'a, F> {
    pub fn new(session: Session, filesystem: &'a F) -> Self {
        Self {
            session,
            filesystem,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn gate(&self, enabled: impl Fn(&InterceptToggles) -> bool) -> Gate<'_> {
        match &self.session {
            Session::Off { .. } => Gate::PassThrough,
            Session::Failed { intercept, .. } if !enabled(intercept) => Gate::PassThrough,
            Session::Failed {
                in_case_of_failure, ..
            } => Gate::Failed(*in_case_of_failure),
            Session::Active(config) if !enabled(&config.settings.intercept) => Gate::PassThrough,
            Session::Active(config) => Gate::Active(config),
        }
    }

    /// Follows `in_case_of_failure` after an internal step failed.
    fn handle_failure<T>(
        policy: FailurePolicy,
        path: &Path,
        real: impl FnOnce() -> crate::Result<T>,
    ) -> crate::Result<T> {
        match policy {
            FailurePolicy::AllowDestruction => real(),
            FailurePolicy::Protect => {
                tracing::warn!(path = %path.display(), "refusing operation after internal failure");
                Err(CoreError::Refused(path.to_path_buf()))
            }
        }
    }

    fn real_unlink(&self, path: &Path) -> crate::Result<()> {
        self.filesystem.remove_file(path)
    }

    fn real_rename(&self, old: &Path, new: &Path) -> crate::Result<()> {
        self.filesystem.rename(old, new)
    }

    fn real_open(&self, path: &Path, follow: bool) -> crate::Result<Box<dyn Write>> {
        self.filesystem.open_write(path, follow)
    }

    /// Deletes `path`, saving it in the trash can first when the policy
    /// says so.
    ///
    /// A file that should have been saved but could not be is never
    /// deleted: the graft error is returned whatever `in_case_of_failure`
    /// says.
    pub fn unlink(&self, path: &Path) -> crate::Result<Outcome> {
        let config = match self.gate(|t| t.unlink) {
            Gate::PassThrough => {
                self.real_unlink(path)?;
                return Ok(Outcome::PassedThrough);
            }
            Gate::Failed(policy) => {
                Self::handle_failure(policy, path, || self.real_unlink(path))?;
                return Ok(Outcome::PassedThrough);
            }
            Gate::Active(config) => config,
        };

        let Some(meta) = candidate(fs::symlink_metadata(path)) else {
            self.real_unlink(path)?;
            return Ok(Outcome::PassedThrough);
        };
        let is_symlink = meta.file_type().is_symlink();

        let absolute = match canonicalize(path, false) {
            Ok(absolute) => absolute,
            Err(err) => {
                tracing::debug!(error = %err, "could not build an absolute path");
                let policy = config.settings.in_case_of_failure;
                Self::handle_failure(policy, path, || self.real_unlink(path))?;
                return Ok(Outcome::PassedThrough);
            }
        };

        match decide_action(&absolute, config) {
            Disposition::Remove => {
                self.real_unlink(path)?;
                Ok(Outcome::Removed)
            }
            Disposition::LeaveUntouched => Err(CoreError::AccessDenied(absolute.as_path().into())),
            Disposition::Save if is_symlink => {
                self.real_unlink(path)?;
                Ok(Outcome::Removed)
            }
            Disposition::Save => match graft_into_trash(self.filesystem, config, &absolute) {
                Ok(destination) => Ok(Outcome::Saved(destination)),
                Err(err) => {
                    tracing::warn!(error = %err, "could not save file, keeping it");
                    Err(err.into())
                }
            },
        }
    }

    /// [`Interceptor::unlink`] for a path relative to an open directory.
    ///
    /// With `AT_REMOVEDIR` in `flags` the path names a directory, which is
    /// removed directly: the trash can only takes files.
    pub fn unlink_at(&self, dirfd: RawFd, path: &Path, flags: c_int) -> crate::Result<Outcome> {
        let resolved = absolute_from_dirfd(dirfd, path)?;
        if flags & libc::AT_REMOVEDIR != 0 {
            fs::remove_dir(&resolved).map_err(|err| CoreError::io(&resolved, err))?;
            return Ok(Outcome::PassedThrough);
        }
        self.unlink(&resolved)
    }

    /// Renames `old` to `new`, saving whatever `new` currently holds.
    pub fn rename(&self, old: &Path, new: &Path) -> crate::Result<Outcome> {
        let config = match self.gate(|t| t.rename) {
            Gate::PassThrough => {
                self.real_rename(old, new)?;
                return Ok(Outcome::PassedThrough);
            }
            Gate::Failed(policy) => {
                Self::handle_failure(policy, new, || self.real_rename(old, new))?;
                return Ok(Outcome::PassedThrough);
            }
            Gate::Active(config) => config,
        };

        let Some(target) = candidate(fs::symlink_metadata(new)) else {
            self.real_rename(old, new)?;
            return Ok(Outcome::PassedThrough);
        };
        let is_symlink = target.file_type().is_symlink();

        let old_is_movable = fs::symlink_metadata(old).map(|meta| !meta.is_dir());
        if !matches!(old_is_movable, Ok(true)) {
            self.real_rename(old, new)?;
            return Ok(Outcome::PassedThrough);
        }

        // Saving `new` is pointless if the rename itself is bound to fail.
        if let WriteAccess::Denied(err) = can_write_to_dir(old)? {
            tracing::debug!(old = %old.display(), error = %err, "source directory not writable");
            self.real_rename(old, new)?;
            return Ok(Outcome::PassedThrough);
        }

        let policy = config.settings.in_case_of_failure;
        let absolute = match canonicalize(new, false) {
            Ok(absolute) => absolute,
            Err(err) => {
                tracing::debug!(error = %err, "could not build an absolute path");
                Self::handle_failure(policy, new, || self.real_rename(old, new))?;
                return Ok(Outcome::PassedThrough);
            }
        };

        match decide_action(&absolute, config) {
            Disposition::Remove => {
                self.real_rename(old, new)?;
                Ok(Outcome::Removed)
            }
            Disposition::LeaveUntouched => Err(CoreError::AccessDenied(absolute.as_path().into())),
            Disposition::Save if is_symlink => {
                self.real_rename(old, new)?;
                Ok(Outcome::Removed)
            }
            Disposition::Save => match graft_into_trash(self.filesystem, config, &absolute) {
                Ok(destination) => {
                    self.real_rename(old, new)?;
                    Ok(Outcome::Saved(destination))
                }
                Err(err) => {
                    tracing::warn!(error = %err, "could not save file before rename");
                    Self::handle_failure(policy, new, || self.real_rename(old, new))?;
                    Ok(Outcome::Removed)
                }
            },
        }
    }

    /// [`Interceptor::rename`] with both paths relative to open directories.
    pub fn rename_at(
        &self,
        old_dirfd: RawFd,
        old: &Path,
        new_dirfd: RawFd,
        new: &Path,
    ) -> crate::Result<Outcome> {
        let old = absolute_from_dirfd(old_dirfd, old)?;
        let new = absolute_from_dirfd(new_dirfd, new)?;
        self.rename(&old, &new)
    }

    /// Opens `path` for writing with truncation, saving its current content
    /// first.
    ///
    /// `call` selects which interception toggle applies. Without
    /// `follow_final_symlink` a symlink at `path` is never saved and the
    /// open itself fails with `ELOOP` (the `O_NOFOLLOW` case). For
    /// [`OpenCall::Open`] the recreated file keeps the permission bits of
    /// the one that was saved.
    pub fn open_truncate(
        &self,
        path: &Path,
        call: OpenCall,
        follow_final_symlink: bool,
    ) -> crate::Result<(Outcome, Box<dyn Write>)> {
        let open = || self.real_open(path, follow_final_symlink);
        let config = match self.gate(|t| call.is_intercepted(t)) {
            Gate::PassThrough => return Ok((Outcome::PassedThrough, open()?)),
            Gate::Failed(policy) => {
                let writer = Self::handle_failure(policy, path, open)?;
                return Ok((Outcome::PassedThrough, writer));
            }
            Gate::Active(config) => config,
        };

        let meta = if follow_final_symlink {
            fs::metadata(path)
        } else {
            fs::symlink_metadata(path)
        };
        let meta = match candidate(meta) {
            Some(meta) if !meta.file_type().is_symlink() => meta,
            _ => return Ok((Outcome::PassedThrough, open()?)),
        };

        let policy = config.settings.in_case_of_failure;
        let absolute = match canonicalize(path, true) {
            Ok(absolute) => absolute,
            Err(err) => {
                tracing::debug!(error = %err, %call, "could not build an absolute path");
                let writer = Self::handle_failure(policy, path, open)?;
                return Ok((Outcome::PassedThrough, writer));
            }
        };

        match decide_action(&absolute, config) {
            Disposition::Remove => Ok((Outcome::Removed, open()?)),
            Disposition::LeaveUntouched => Err(CoreError::AccessDenied(absolute.as_path().into())),
            Disposition::Save => match graft_into_trash(self.filesystem, config, &absolute) {
                Ok(destination) => {
                    let writer = open()?;
                    if call == OpenCall::Open {
                        let mode = meta.permissions().mode() & 0o7777;
                        if let Err(err) = fs::set_permissions(path, Permissions::from_mode(mode)) {
                            tracing::debug!(error = %err, "could not restore permission bits");
                        }
                    }
                    Ok((Outcome::Saved(destination), writer))
                }
                Err(err) => {
                    tracing::warn!(error = %err, %call, "could not save file before truncation");
                    let writer = Self::handle_failure(policy, path, open)?;
                    Ok((Outcome::Removed, writer))
                }
            },
        }
    }

    /// [`Interceptor::open_truncate`] for a path relative to an open
    /// directory.
    pub fn open_truncate_at(
        &self,
        dirfd: RawFd,
        path: &Path,
        call: OpenCall,
        follow_final_symlink: bool,
    ) -> crate::Result<(Outcome, Box<dyn Write>)> {
        let resolved = absolute_from_dirfd(dirfd, path)?;
        self.open_truncate(&resolved, call, follow_final_symlink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GraftError;
    use crate::fs::RealFileSystem;
    use crate::settings::{EnvOverrides, RawValues};
    use std::io::Read;
    use std::path::PathBuf;
    use tempfile::Builder;

    struct Home {
        _dir: tempfile::TempDir,
        path: PathBuf,
    }

    impl Home {
        fn new() -> Self {
            let dir = Builder::new()
                .prefix("intercept")
                .tempdir()
                .expect("Failed to create temp dir");
            let path = fs::canonicalize(dir.path()).unwrap();
            Self { _dir: dir, path }
        }

        fn session(&self, extra: &[(&str, &str)]) -> Session {
            let mut values: RawValues = [("TEMPORARY_DIRS", "")]
                .iter()
                .chain(extra)
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            values.entry("IN_CASE_OF_FAILURE".into()).or_insert_with(|| "PROTECT".into());
            Session::init_for_home(
                &RealFileSystem,
                &values,
                &EnvOverrides::default(),
                self.path.to_str().unwrap(),
            )
        }

        fn write(&self, name: &str, contents: &[u8]) -> PathBuf {
            let path = self.path.join(name);
            fs::write(&path, contents).unwrap();
            path
        }

        fn trash(&self, name: &str) -> PathBuf {
            self.path.join("Trash").join(name)
        }
    }

    /// Rename always fails with EIO, so grafting cannot succeed.
    struct BrokenRename;

    impl FileSystem for BrokenRename {
        fn remove_file(&self, path: &Path) -> crate::Result<()> {
            RealFileSystem.remove_file(path)
        }

        fn rename(&self, from: &Path, _to: &Path) -> crate::Result<()> {
            Err(CoreError::io(from, io::Error::from_raw_os_error(libc::EIO)))
        }

        fn open_read(&self, path: &Path) -> crate::Result<Box<dyn Read>> {
            RealFileSystem.open_read(path)
        }

        fn open_write(&self, path: &Path, follow: bool) -> crate::Result<Box<dyn Write>> {
            RealFileSystem.open_write(path, follow)
        }
    }

    #[test]
    fn unlink_saves_ordinary_files() {
        let home = Home::new();
        let file = home.write("report.txt", b"quarterly");
        let interceptor = Interceptor::new(home.session(&[]), &RealFileSystem);

        let outcome = interceptor.unlink(&file).unwrap();

        assert_eq!(outcome, Outcome::Saved(home.trash("report.txt")));
        assert!(!file.exists());
        assert_eq!(fs::read(home.trash("report.txt")).unwrap(), b"quarterly");
    }

    #[test]
    fn unlink_removes_disposable_files() {
        let home = Home::new();
        let file = home.write("empty.txt", b"");
        let interceptor = Interceptor::new(home.session(&[]), &RealFileSystem);

        assert_eq!(interceptor.unlink(&file).unwrap(), Outcome::Removed);
        assert!(!file.exists());
        assert!(!home.trash("empty.txt").exists());
    }

    #[test]
    fn unlink_of_symlink_never_saves() {
        let home = Home::new();
        let target = home.write("target.txt", b"data");
        let link = home.path.join("link.txt");
        std::os::unix::fs::symlink(&target, &link).unwrap();
        let interceptor = Interceptor::new(home.session(&[]), &RealFileSystem);

        assert_eq!(interceptor.unlink(&link).unwrap(), Outcome::Removed);
        assert!(fs::symlink_metadata(&link).is_err());
        assert!(target.exists());
    }

    #[test]
    fn unlink_refuses_protected_files() {
        let home = Home::new();
        let config_file = home.write(".libtrash", b"SHOULD_WARN=NO\n");
        let interceptor = Interceptor::new(home.session(&[]), &RealFileSystem);

        let err = interceptor.unlink(&config_file).unwrap_err();
        assert_eq!(err.errno(), libc::EACCES);
        assert!(config_file.exists());
    }

    #[test]
    fn unlink_of_missing_file_reports_the_real_error() {
        let home = Home::new();
        let interceptor = Interceptor::new(home.session(&[]), &RealFileSystem);
        let err = interceptor.unlink(&home.path.join("ghost")).unwrap_err();
        assert_eq!(err.errno(), libc::ENOENT);
    }

    #[test]
    fn disabled_unlink_interception_passes_through() {
        let home = Home::new();
        let file = home.write("plain.txt", b"x");
        let interceptor =
            Interceptor::new(home.session(&[("INTERCEPT_UNLINK", "NO")]), &RealFileSystem);

        assert_eq!(interceptor.unlink(&file).unwrap(), Outcome::PassedThrough);
        assert!(!home.trash("plain.txt").exists());
    }

    #[test]
    fn unlink_keeps_files_that_could_not_be_saved() {
        let home = Home::new();
        let file = home.write("valuable.txt", b"x");

        for policy in ["PROTECT", "ALLOW_DESTRUCTION"] {
            let interceptor = Interceptor::new(
                home.session(&[("IN_CASE_OF_FAILURE", policy)]),
                &BrokenRename,
            );
            let err = interceptor.unlink(&file).unwrap_err();
            assert!(matches!(err, CoreError::Graft(GraftError::Other { .. })));
            assert_eq!(err.errno(), 0);
            assert_eq!(fs::read(&file).unwrap(), b"x");
        }
        assert!(!home.trash("valuable.txt").exists());
    }

    #[test]
    fn rename_after_failed_save_follows_failure_policy() {
        let home = Home::new();
        let old = home.write("incoming.txt", b"new");
        let new = home.write("existing.txt", b"old");

        let protect = Interceptor::new(home.session(&[]), &BrokenRename);
        let err = protect.rename(&old, &new).unwrap_err();
        assert!(matches!(err, CoreError::Refused(_)));
        assert_eq!(fs::read(&new).unwrap(), b"old");

        // Allowed to proceed, the real rename runs and reports its own error.
        let allow = Interceptor::new(
            home.session(&[("IN_CASE_OF_FAILURE", "ALLOW_DESTRUCTION")]),
            &BrokenRename,
        );
        let err = allow.rename(&old, &new).unwrap_err();
        assert_eq!(err.errno(), libc::EIO);
        assert!(!home.trash("existing.txt").exists());
    }

    #[test]
    fn failed_session_protects_everything() {
        let home = Home::new();
        let file = home.write("kept.txt", b"x");
        let session = Session::Failed {
            in_case_of_failure: FailurePolicy::Protect,
            intercept: InterceptToggles::default(),
        };
        let interceptor = Interceptor::new(session, &RealFileSystem);

        let err = interceptor.unlink(&file).unwrap_err();
        assert_eq!(err.errno(), 0);
        assert!(file.exists());
    }

    #[test]
    fn off_session_passes_everything_through() {
        let home = Home::new();
        let file = home.write("gone.txt", b"x");
        let interceptor = Interceptor::new(Session::Off { should_warn: true }, &RealFileSystem);

        assert_eq!(interceptor.unlink(&file).unwrap(), Outcome::PassedThrough);
        assert!(!file.exists());
    }

    #[test]
    fn rename_over_existing_file_saves_the_victim() {
        let home = Home::new();
        let old = home.write("new-draft.txt", b"new");
        let new = home.write("draft.txt", b"old");
        let interceptor = Interceptor::new(home.session(&[]), &RealFileSystem);

        let outcome = interceptor.rename(&old, &new).unwrap();

        assert_eq!(outcome, Outcome::Saved(home.trash("draft.txt")));
        assert_eq!(fs::read(&new).unwrap(), b"new");
        assert_eq!(fs::read(home.trash("draft.txt")).unwrap(), b"old");
        assert!(!old.exists());
    }

    #[test]
    fn rename_to_fresh_name_is_untouched() {
        let home = Home::new();
        let old = home.write("a.txt", b"a");
        let new = home.path.join("b.txt");
        let interceptor = Interceptor::new(home.session(&[]), &RealFileSystem);

        assert_eq!(interceptor.rename(&old, &new).unwrap(), Outcome::PassedThrough);
        assert_eq!(fs::read(&new).unwrap(), b"a");
    }

    #[test]
    fn rename_from_missing_source_saves_nothing() {
        let home = Home::new();
        let new = home.write("victim.txt", b"v");
        let interceptor = Interceptor::new(home.session(&[]), &RealFileSystem);

        assert!(interceptor.rename(&home.path.join("absent"), &new).is_err());
        assert_eq!(fs::read(&new).unwrap(), b"v");
        assert!(!home.trash("victim.txt").exists());
    }

    #[test]
    fn open_truncate_saves_previous_content_and_mode() {
        let home = Home::new();
        let file = home.write("config.ini", b"old settings");
        fs::set_permissions(&file, Permissions::from_mode(0o640)).unwrap();
        let interceptor = Interceptor::new(home.session(&[]), &RealFileSystem);

        let (outcome, mut writer) = interceptor.open_truncate(&file, OpenCall::Open, true).unwrap();
        writer.write_all(b"new settings").unwrap();
        writer.flush().unwrap();
        drop(writer);

        assert_eq!(outcome, Outcome::Saved(home.trash("config.ini")));
        assert_eq!(fs::read(&file).unwrap(), b"new settings");
        assert_eq!(fs::read(home.trash("config.ini")).unwrap(), b"old settings");
        let mode = fs::metadata(&file).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[test]
    fn open_truncate_without_following_leaves_symlinks_alone() {
        let home = Home::new();
        let target = home.write("real.txt", b"content");
        let link = home.path.join("alias.txt");
        std::os::unix::fs::symlink(&target, &link).unwrap();
        let interceptor = Interceptor::new(home.session(&[]), &RealFileSystem);

        let err = interceptor
            .open_truncate(&link, OpenCall::Open, false)
            .err()
            .expect("opening a symlink without following must fail");
        assert_eq!(err.errno(), libc::ELOOP);
        assert_eq!(fs::read(&target).unwrap(), b"content");
        assert!(!home.trash("real.txt").exists());
        assert!(!home.trash("alias.txt").exists());
    }

    #[test]
    fn each_open_entry_point_has_its_own_toggle() {
        let home = Home::new();
        let session = || home.session(&[("INTERCEPT_FOPEN", "NO")]);

        let file = home.write("notes.txt", b"first");
        let fopen = Interceptor::new(session(), &RealFileSystem);
        let (outcome, writer) = fopen.open_truncate(&file, OpenCall::Fopen, true).unwrap();
        drop(writer);
        assert_eq!(outcome, Outcome::PassedThrough);
        assert!(!home.trash("notes.txt").exists());

        fs::write(&file, b"second").unwrap();
        let freopen = Interceptor::new(session(), &RealFileSystem);
        let (outcome, writer) = freopen.open_truncate(&file, OpenCall::Freopen, true).unwrap();
        drop(writer);
        assert_eq!(outcome, Outcome::Saved(home.trash("notes.txt")));
        assert_eq!(fs::read(home.trash("notes.txt")).unwrap(), b"second");
    }

    #[test]
    fn unlink_at_resolves_relative_names() {
        use std::os::unix::io::AsRawFd;

        let home = Home::new();
        home.write("relative.txt", b"r");
        let handle = fs::File::open(&home.path).unwrap();
        let interceptor = Interceptor::new(home.session(&[]), &RealFileSystem);

        let outcome = interceptor
            .unlink_at(handle.as_raw_fd(), Path::new("relative.txt"), 0)
            .unwrap();
        assert_eq!(outcome, Outcome::Saved(home.trash("relative.txt")));
    }

    #[test]
    fn unlink_at_with_removedir_removes_directories() {
        use std::os::unix::io::AsRawFd;

        let home = Home::new();
        fs::create_dir(home.path.join("build")).unwrap();
        let handle = fs::File::open(&home.path).unwrap();
        let interceptor = Interceptor::new(home.session(&[]), &RealFileSystem);

        let outcome = interceptor
            .unlink_at(handle.as_raw_fd(), Path::new("build"), libc::AT_REMOVEDIR)
            .unwrap();
        assert_eq!(outcome, Outcome::PassedThrough);
        assert!(!home.path.join("build").exists());
        assert!(!home.trash("build").exists());

        fs::create_dir(home.path.join("full")).unwrap();
        home.write("full/item.txt", b"i");
        let err = interceptor
            .unlink_at(handle.as_raw_fd(), Path::new("full"), libc::AT_REMOVEDIR)
            .unwrap_err();
        assert_eq!(err.errno(), libc::ENOTEMPTY);
    }

    #[test]
    fn rename_at_saves_the_victim_between_directories() {
        use std::os::unix::io::AsRawFd;

        let home = Home::new();
        fs::create_dir(home.path.join("incoming")).unwrap();
        fs::create_dir(home.path.join("docs")).unwrap();
        home.write("incoming/plan.txt", b"v2");
        home.write("docs/plan.txt", b"v1");
        let incoming = fs::File::open(home.path.join("incoming")).unwrap();
        let docs = fs::File::open(home.path.join("docs")).unwrap();
        let interceptor = Interceptor::new(home.session(&[]), &RealFileSystem);

        let outcome = interceptor
            .rename_at(
                incoming.as_raw_fd(),
                Path::new("plan.txt"),
                docs.as_raw_fd(),
                Path::new("plan.txt"),
            )
            .unwrap();

        assert_eq!(outcome, Outcome::Saved(home.trash("docs/plan.txt")));
        assert_eq!(fs::read(home.path.join("docs/plan.txt")).unwrap(), b"v2");
        assert_eq!(fs::read(home.trash("docs/plan.txt")).unwrap(), b"v1");
    }

    #[test]
    fn open_truncate_at_resolves_relative_names() {
        use std::os::unix::io::AsRawFd;

        let home = Home::new();
        home.write("ledger.csv", b"1,2");
        let handle = fs::File::open(&home.path).unwrap();
        let interceptor = Interceptor::new(home.session(&[]), &RealFileSystem);

        let (outcome, writer) = interceptor
            .open_truncate_at(handle.as_raw_fd(), Path::new("ledger.csv"), OpenCall::Open, true)
            .unwrap();
        drop(writer);

        assert_eq!(outcome, Outcome::Saved(home.trash("ledger.csv")));
        assert_eq!(fs::read(home.trash("ledger.csv")).unwrap(), b"1,2");
        assert_eq!(fs::read(home.path.join("ledger.csv")).unwrap(), b"");
    }
}
