//! Compiled-in defaults and the overlay of user-provided values onto them.

use crate::models::{FailurePolicy, InterceptToggles};
use std::borrow::Cow;
use std::collections::HashMap;

pub const DEFAULT_TRASH_CAN: &str = "Trash";
pub const DEFAULT_TRASH_SYSTEM_ROOT: &str = "SYSTEM_ROOT";
pub const DEFAULT_TEMPORARY_DIRS: &str = "/tmp;/var";
pub const DEFAULT_USER_TEMPORARY_DIRS: &str = "";
pub const DEFAULT_UNREMOVABLE_DIRS: &str = "/etc;/usr;/sbin;/bin;/lib;/opt;/boot";
pub const DEFAULT_IGNORE_EXTENSIONS: &str = "o;exe";
pub const DEFAULT_REMOVABLE_MEDIA_MOUNT_POINTS: &str = "/mnt;/cdrom";
pub const DEFAULT_EXCEPTIONS: &str =
    "/etc/mtab;/etc/resolv.conf;/etc/adjtime;/etc/upsstatus;/etc/dhcpc";
pub const DEFAULT_IGNORE_RE: &str = "";

const MEBIBYTE: u64 = 1_048_576;
const GIBIBYTE: u64 = 1_073_741_824;

/// Keys recognised in the personal configuration file, in merge order.
pub const CONFIG_KEYS: [&str; 23] = [
    "TRASH_CAN",
    "IN_CASE_OF_FAILURE",
    "SHOULD_WARN",
    "IGNORE_HIDDEN",
    "IGNORE_EDITOR_BACKUP",
    "PROTECT_TRASH",
    "GLOBAL_PROTECTION",
    "TRASH_SYSTEM_ROOT",
    "TEMPORARY_DIRS",
    "USER_TEMPORARY_DIRS",
    "UNREMOVABLE_DIRS",
    "IGNORE_EXTENSIONS",
    "INTERCEPT_UNLINK",
    "INTERCEPT_RENAME",
    "INTERCEPT_FOPEN",
    "INTERCEPT_FREOPEN",
    "INTERCEPT_OPEN",
    "LIBTRASH_CONFIG_FILE_UNREMOVABLE",
    "REMOVABLE_MEDIA_MOUNT_POINTS",
    "IGNORE_EDITOR_TEMPORARY",
    "EXCEPTIONS",
    "IGNORE_RE",
    "PRESERVE_FILES_LARGER_THAN",
];

/// Raw key/value pairs read from a configuration source.
pub type RawValues = HashMap<String, String>;

/// Supplies the user's raw configuration values.
///
/// `None` means the source could not be read at all; that is not an error,
/// the compiled-in defaults simply stay in force.
pub trait ConfigSource {
    fn load(&self, home: &str) -> Option<RawValues>;
}

/// A source that never has anything to say.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoConfig;

impl ConfigSource for NoConfig {
    fn load(&self, _home: &str) -> Option<RawValues> {
        None
    }
}

impl ConfigSource for RawValues {
    fn load(&self, _home: &str) -> Option<RawValues> {
        Some(self.clone())
    }
}

/// Every user-tunable policy setting.
///
/// List fields borrow the compiled-in constants until a user value replaces
/// them; defaults are never mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub in_case_of_failure: FailurePolicy,
    pub should_warn: bool,
    pub ignore_hidden: bool,
    pub ignore_editor_backup: bool,
    pub ignore_editor_temporary: bool,
    pub protect_trash: bool,
    pub global_protection: bool,
    pub libtrash_config_file_unremovable: bool,
    pub intercept: InterceptToggles,
    pub trash_can: Cow<'static, str>,
    pub trash_system_root: Cow<'static, str>,
    pub temporary_dirs: Cow<'static, str>,
    /// Relative to the home directory.
    pub user_temporary_dirs: Cow<'static, str>,
    pub unremovable_dirs: Cow<'static, str>,
    pub ignore_extensions: Cow<'static, str>,
    pub removable_media_mount_points: Cow<'static, str>,
    pub exceptions: Cow<'static, str>,
    /// Empty disables the rule.
    pub ignore_re: Cow<'static, str>,
    /// Byte threshold; 0 disables the rule.
    pub preserve_files_larger_than_limit: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            in_case_of_failure: FailurePolicy::AllowDestruction,
            should_warn: true,
            ignore_hidden: true,
            ignore_editor_backup: true,
            ignore_editor_temporary: true,
            protect_trash: true,
            global_protection: true,
            libtrash_config_file_unremovable: true,
            intercept: InterceptToggles::default(),
            trash_can: Cow::Borrowed(DEFAULT_TRASH_CAN),
            trash_system_root: Cow::Borrowed(DEFAULT_TRASH_SYSTEM_ROOT),
            temporary_dirs: Cow::Borrowed(DEFAULT_TEMPORARY_DIRS),
            user_temporary_dirs: Cow::Borrowed(DEFAULT_USER_TEMPORARY_DIRS),
            unremovable_dirs: Cow::Borrowed(DEFAULT_UNREMOVABLE_DIRS),
            ignore_extensions: Cow::Borrowed(DEFAULT_IGNORE_EXTENSIONS),
            removable_media_mount_points: Cow::Borrowed(DEFAULT_REMOVABLE_MEDIA_MOUNT_POINTS),
            exceptions: Cow::Borrowed(DEFAULT_EXCEPTIONS),
            ignore_re: Cow::Borrowed(DEFAULT_IGNORE_RE),
            preserve_files_larger_than_limit: 0,
        }
    }
}

/// "YES"/"NO" to a boolean; anything else (or nothing) keeps `default`.
fn flag(value: Option<&String>, default: bool) -> bool {
    match value.map(String::as_str) {
        Some("YES") => true,
        Some("NO") => false,
        _ => default,
    }
}

fn failure_policy(value: Option<&String>, default: FailurePolicy) -> FailurePolicy {
    match value.map(String::as_str) {
        Some("ALLOW_DESTRUCTION") => FailurePolicy::AllowDestruction,
        Some("PROTECT") => FailurePolicy::Protect,
        _ => default,
    }
}

fn owned_list(value: Option<&String>, current: Cow<'static, str>) -> Cow<'static, str> {
    match value {
        Some(value) => Cow::Owned(value.clone()),
        None => current,
    }
}

/// Parses a PRESERVE_FILES_LARGER_THAN value such as `10M` or `2g`.
///
/// Requires a non-negative decimal number followed by an `M` or `G`
/// suffix (either case). Anything else yields `None`.
pub fn parse_size_limit(value: &str) -> Option<u64> {
    if value.is_empty() || value.starts_with('-') {
        return None;
    }
    let factor = match value.chars().last()? {
        'M' | 'm' => MEBIBYTE,
        'G' | 'g' => GIBIBYTE,
        _ => return None,
    };
    let number: u64 = value[..value.len() - 1].parse().ok()?;
    number.checked_mul(factor)
}

impl Settings {
    /// Overlays `values` onto `self` in the order of [`CONFIG_KEYS`].
    pub fn merge(mut self, values: &RawValues) -> Self {
        let defaults = Settings::default();

        if let Some(trash_can) = values.get("TRASH_CAN").filter(|v| !v.is_empty()) {
            self.trash_can = Cow::Owned(trash_can.clone());
        }

        self.in_case_of_failure =
            failure_policy(values.get("IN_CASE_OF_FAILURE"), defaults.in_case_of_failure);
        self.should_warn = flag(values.get("SHOULD_WARN"), defaults.should_warn);
        self.ignore_hidden = flag(values.get("IGNORE_HIDDEN"), defaults.ignore_hidden);
        self.ignore_editor_backup =
            flag(values.get("IGNORE_EDITOR_BACKUP"), defaults.ignore_editor_backup);
        self.protect_trash = flag(values.get("PROTECT_TRASH"), defaults.protect_trash);
        self.global_protection = flag(values.get("GLOBAL_PROTECTION"), defaults.global_protection);

        if let Some(root) = values.get("TRASH_SYSTEM_ROOT") {
            if self.global_protection && !root.is_empty() {
                self.trash_system_root = Cow::Owned(root.clone());
            }
        }

        self.temporary_dirs = owned_list(values.get("TEMPORARY_DIRS"), self.temporary_dirs);
        self.user_temporary_dirs =
            owned_list(values.get("USER_TEMPORARY_DIRS"), self.user_temporary_dirs);
        self.unremovable_dirs = owned_list(values.get("UNREMOVABLE_DIRS"), self.unremovable_dirs);
        self.ignore_extensions =
            owned_list(values.get("IGNORE_EXTENSIONS"), self.ignore_extensions);

        self.intercept = InterceptToggles {
            unlink: flag(values.get("INTERCEPT_UNLINK"), defaults.intercept.unlink),
            rename: flag(values.get("INTERCEPT_RENAME"), defaults.intercept.rename),
            fopen: flag(values.get("INTERCEPT_FOPEN"), defaults.intercept.fopen),
            freopen: flag(values.get("INTERCEPT_FREOPEN"), defaults.intercept.freopen),
            open: flag(values.get("INTERCEPT_OPEN"), defaults.intercept.open),
        };

        self.libtrash_config_file_unremovable = flag(
            values.get("LIBTRASH_CONFIG_FILE_UNREMOVABLE"),
            defaults.libtrash_config_file_unremovable,
        );
        self.removable_media_mount_points = owned_list(
            values.get("REMOVABLE_MEDIA_MOUNT_POINTS"),
            self.removable_media_mount_points,
        );
        self.ignore_editor_temporary =
            flag(values.get("IGNORE_EDITOR_TEMPORARY"), defaults.ignore_editor_temporary);
        self.exceptions = owned_list(values.get("EXCEPTIONS"), self.exceptions);
        self.ignore_re = owned_list(values.get("IGNORE_RE"), self.ignore_re);

        self.preserve_files_larger_than_limit = 0;
        if let Some(raw) = values.get("PRESERVE_FILES_LARGER_THAN") {
            match parse_size_limit(raw) {
                Some(limit) => self.preserve_files_larger_than_limit = limit,
                None => tracing::warn!(
                    value = %raw,
                    "invalid PRESERVE_FILES_LARGER_THAN setting ignored"
                ),
            }
        }

        self
    }

    /// Reads `source` and overlays it; an unreadable source keeps `self`.
    pub fn load_from(self, source: &dyn ConfigSource, home: &str) -> Self {
        match source.load(home) {
            Some(values) => self.merge(&values),
            None => {
                tracing::debug!("no personal configuration found, using defaults");
                self
            }
        }
    }
}

/// Overrides taken from the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    /// TRASH_OFF=YES disables the engine for this call.
    pub trash_off: bool,
    /// UNCOVER_DIRS: directories temporarily removed from UNREMOVABLE_DIRS.
    pub uncover_dirs: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut overrides = Self::default();
        for (key, value) in vars {
            match key.as_ref() {
                "TRASH_OFF" => {
                    let value: String = value.into();
                    overrides.trash_off = value == "YES";
                }
                "UNCOVER_DIRS" => overrides.uncover_dirs = Some(value.into()),
                _ => {}
            }
        }
        overrides
    }
}
