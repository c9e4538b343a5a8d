//! Permission probes evaluated as the effective (acting) identity.
//!
//! `access(2)` checks the real uid. A set-uid process deciding on behalf of
//! its caller must instead ask about the effective uid, so the real uid is
//! switched to the effective one for exactly one check and restored after.

use crate::errors::CoreError;
use crate::helpers::parent_dir;
use std::ffi::{CStr, CString};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// Result of a write-access probe.
#[derive(Debug)]
pub enum WriteAccess {
    Allowed,
    Denied(io::Error),
    /// The probe itself could not run.
    Inconclusive,
}

/// Real uid temporarily set to the effective uid. Restores on drop.
#[derive(Debug)]
pub struct EffectiveIdentity {
    real_uid: libc::uid_t,
    restored: bool,
}

impl EffectiveIdentity {
    pub fn assume() -> io::Result<Self> {
        // SAFETY: getuid/geteuid cannot fail.
        let (real_uid, effective_uid) = unsafe { (libc::getuid(), libc::geteuid()) };
        // SAFETY: -1 leaves the effective uid unchanged.
        let ret = unsafe { libc::setreuid(effective_uid, libc::uid_t::MAX) };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self {
            real_uid,
            restored: false,
        })
    }

    /// Puts the original real uid back.
    ///
    /// A failure here leaves the process with altered privileges; callers
    /// must abort the enclosing operation.
    pub fn restore(mut self) -> crate::Result<()> {
        self.restored = true;
        restore_real_uid(self.real_uid)
    }
}

impl Drop for EffectiveIdentity {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(err) = restore_real_uid(self.real_uid) {
            tracing::error!(error = %err, "real uid left altered after permission probe");
        }
        self.restored = true;
    }
}

fn restore_real_uid(uid: libc::uid_t) -> crate::Result<()> {
    // SAFETY: -1 leaves the effective uid unchanged.
    let ret = unsafe { libc::setreuid(uid, libc::uid_t::MAX) };
    if ret != 0 {
        return Err(CoreError::IdentityRestore {
            uid,
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}

fn access(path: &Path, mode: libc::c_int) -> Option<io::Result<()>> {
    let c_path = CString::new(path.as_os_str().as_bytes()).ok()?;
    // SAFETY: `c_path` is a valid NUL-terminated string.
    let ret = unsafe { libc::access(c_path.as_ptr(), mode) };
    if ret == 0 {
        Some(Ok(()))
    } else {
        Some(Err(io::Error::last_os_error()))
    }
}

/// Checks whether the effective identity may write to the directory holding
/// `file_path`.
///
/// Internal trouble (the uid switch failing, a path with an interior NUL)
/// yields `Inconclusive` so callers can proceed. Failing to restore the real
/// uid is the only error.
pub fn can_write_to_dir(file_path: &Path) -> crate::Result<WriteAccess> {
    let text = file_path.to_string_lossy();
    let dir = Path::new(parent_dir(&text)).to_path_buf();

    let identity = match EffectiveIdentity::assume() {
        Ok(identity) => identity,
        Err(err) => {
            tracing::warn!(error = %err, "unable to assume effective uid for access probe");
            return Ok(WriteAccess::Inconclusive);
        }
    };

    let verdict = match access(&dir, libc::W_OK) {
        Some(Ok(())) => WriteAccess::Allowed,
        Some(Err(err)) => WriteAccess::Denied(err),
        None => WriteAccess::Inconclusive,
    };

    identity.restore()?;
    tracing::debug!(dir = %dir.display(), ?verdict, "write access probe");
    Ok(verdict)
}

/// Write and search permission on a directory for the effective identity.
pub fn dir_is_usable(path: &Path) -> bool {
    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: `c_path` is a valid NUL-terminated string; AT_EACCESS makes
    // the kernel check the effective ids without touching the real uid.
    let ret = unsafe {
        libc::faccessat(
            libc::AT_FDCWD,
            c_path.as_ptr(),
            libc::W_OK | libc::X_OK,
            libc::AT_EACCESS,
        )
    };
    ret == 0
}

/// Home directory of the effective user, from the password database.
pub fn effective_home() -> crate::Result<String> {
    // SAFETY: geteuid cannot fail.
    let uid = unsafe { libc::geteuid() };
    let mut buf = vec![0u8; 1024];

    loop {
        let mut entry: libc::passwd = unsafe { std::mem::zeroed() };
        let mut result: *mut libc::passwd = std::ptr::null_mut();
        // SAFETY: every pointer refers to live, correctly sized storage.
        let ret = unsafe {
            libc::getpwuid_r(
                uid,
                &mut entry,
                buf.as_mut_ptr().cast(),
                buf.len(),
                &mut result,
            )
        };

        if ret == libc::ERANGE {
            let grown = buf.len() * 2;
            buf.resize(grown, 0);
            continue;
        }
        if ret != 0 {
            return Err(CoreError::io(
                "/etc/passwd",
                io::Error::from_raw_os_error(ret),
            ));
        }
        if result.is_null() || entry.pw_dir.is_null() {
            return Err(CoreError::missing(format!("password entry for uid {uid}")));
        }

        // SAFETY: pw_dir points into `buf`, NUL-terminated by getpwuid_r.
        let dir = unsafe { CStr::from_ptr(entry.pw_dir) };
        return dir
            .to_str()
            .map(str::to_owned)
            .map_err(|_| CoreError::invalid_path(dir.to_string_lossy()));
    }
}
