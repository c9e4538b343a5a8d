use crate::errors::CoreError;
use crate::helpers::expand_user_dirs;
use crate::settings::Settings;
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

/// Name of the personal configuration file, relative to the home directory.
pub const PERSONAL_CONF_FILE: &str = ".libtrash";

/// What to do whenever an internal step fails.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum FailurePolicy {
    /// Perform the real operation as if the engine were absent.
    AllowDestruction,
    /// Fail the call.
    Protect,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllowDestruction => "ALLOW_DESTRUCTION",
            Self::Protect => "PROTECT",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-operation switches; a disabled operation is always passed through.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct InterceptToggles {
    pub unlink: bool,
    pub rename: bool,
    pub fopen: bool,
    pub freopen: bool,
    pub open: bool,
}

impl Default for InterceptToggles {
    fn default() -> Self {
        Self {
            unlink: true,
            rename: true,
            fopen: true,
            freopen: true,
            open: true,
        }
    }
}

/// Which open-style entry point a truncating open came through.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum OpenCall {
    Open,
    Fopen,
    Freopen,
}

impl OpenCall {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Fopen => "fopen",
            Self::Freopen => "freopen",
        }
    }

    /// Whether `toggles` has interception enabled for this entry point.
    pub fn is_intercepted(&self, toggles: &InterceptToggles) -> bool {
        match self {
            Self::Open => toggles.open,
            Self::Fopen => toggles.fopen,
            Self::Freopen => toggles.freopen,
        }
    }
}

impl fmt::Display for OpenCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of the decision policy for one path.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Disposition {
    /// Let the real operation destroy the file.
    Remove,
    /// Move the file into the trash can first.
    Save,
    /// Refuse the operation with an access-denied error.
    LeaveUntouched,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remove => "remove",
            Self::Save => "save",
            Self::LeaveUntouched => "leave-untouched",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What an intercepted call ended up doing.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Outcome {
    /// The engine stayed out of the way and called the real operation.
    PassedThrough,
    /// The policy allowed destruction; the real operation ran.
    Removed,
    /// A copy was placed in the trash can at the given path.
    Saved(PathBuf),
}

/// An absolute, policy-ready path (no `.`/`..` segments, parent symlinks
/// resolved).
///
/// Kept as UTF-8 text because every policy rule is a string rule.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct AbsolutePath(String);

impl AbsolutePath {
    pub fn new(path: impl Into<String>) -> crate::Result<Self> {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(CoreError::invalid_path(path));
        }
        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<PathBuf> for AbsolutePath {
    type Error = CoreError;

    fn try_from(path: PathBuf) -> crate::Result<Self> {
        match path.into_os_string().into_string() {
            Ok(text) => Self::new(text),
            Err(raw) => Err(CoreError::invalid_path(raw.to_string_lossy())),
        }
    }
}

impl AsRef<Path> for AbsolutePath {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl fmt::Display for AbsolutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of every policy setting plus the derived absolute paths, built
/// fresh for one intercepted call.
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    /// Directories temporarily excluded from `unremovable_dirs` (UNCOVER_DIRS).
    pub uncovered_dirs: Option<String>,
    /// `user_temporary_dirs` rewritten relative to `home`.
    pub user_temporary_dirs: Cow<'static, str>,
    pub home: String,
    pub absolute_trash_can: String,
    /// Only set when global protection is on.
    pub absolute_trash_system_root: Option<String>,
}

impl Config {
    /// Derives the absolute paths for `home` without touching the disk.
    pub fn for_home(settings: Settings, home: &str, uncovered_dirs: Option<String>) -> Self {
        let home = home.trim_end_matches('/');
        let home = if home.is_empty() { "/" } else { home }.to_string();
        let absolute_trash_can = format!("{}/{}", home, settings.trash_can);
        let absolute_trash_system_root = settings
            .global_protection
            .then(|| format!("{}/{}", absolute_trash_can, settings.trash_system_root));
        let user_temporary_dirs = if settings.user_temporary_dirs.is_empty() {
            Cow::Borrowed("")
        } else {
            Cow::Owned(expand_user_dirs(&settings.user_temporary_dirs, &home))
        };

        Self {
            settings,
            uncovered_dirs,
            user_temporary_dirs,
            home,
            absolute_trash_can,
            absolute_trash_system_root,
        }
    }

    /// Path of the personal configuration file.
    pub fn personal_config_file(&self) -> PathBuf {
        Path::new(&self.home).join(PERSONAL_CONF_FILE)
    }
}
