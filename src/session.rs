//! Per-call initialization.
//!
//! Every intercepted call starts by building a [`Session`]: the real
//! operations are checked, the environment overrides are read, the
//! personal configuration is merged and the trash directories are made
//! ready. The outcome is a value the call consumes, not process state.

use crate::errors::CoreError;
use crate::fs::{FileSystem, RealOp};
use crate::graft::{dir_ok, DirError};
use crate::identity::effective_home;
use crate::models::{Config, FailurePolicy, InterceptToggles};
use crate::settings::{ConfigSource, EnvOverrides, Settings};
use std::path::Path;

/// Printed once per call while the engine is switched off.
pub const DISABLED_WARNING: &str =
    "libtrash: TRASH_OFF is set, deleted files are NOT being saved in the trash can";

/// Outcome of initializing the engine for one call.
#[derive(Debug, Clone)]
pub enum Session {
    /// Fully configured; the policy applies.
    Active(Config),
    /// TRASH_OFF=YES: everything passes straight through.
    Off { should_warn: bool },
    /// Initialization failed; every intercepted call follows
    /// `in_case_of_failure`.
    Failed {
        in_case_of_failure: FailurePolicy,
        intercept: InterceptToggles,
    },
}

impl Session {
    /// Initializes for the effective user, whose home comes from the
    /// password database.
    pub fn init(
        filesystem: &dyn FileSystem,
        source: &dyn ConfigSource,
        env: &EnvOverrides,
    ) -> Self {
        if let Some(session) = Self::preflight(filesystem, env) {
            return session;
        }
        match effective_home() {
            Ok(home) => Self::configure(source, env, &home),
            Err(err) => {
                tracing::warn!(error = %err, "home directory lookup failed");
                Self::failed(&Settings::default())
            }
        }
    }

    /// Same as [`Session::init`] with an explicit home directory.
    pub fn init_for_home(
        filesystem: &dyn FileSystem,
        source: &dyn ConfigSource,
        env: &EnvOverrides,
        home: &str,
    ) -> Self {
        if let Some(session) = Self::preflight(filesystem, env) {
            return session;
        }
        Self::configure(source, env, home)
    }

    fn preflight(filesystem: &dyn FileSystem, env: &EnvOverrides) -> Option<Self> {
        if let Some(op) = RealOp::ALL.into_iter().find(|op| !filesystem.provides(*op)) {
            let err = CoreError::UnavailableOperation(op);
            tracing::warn!(error = %err, "general failure");
            return Some(Self::failed(&Settings::default()));
        }
        if env.trash_off {
            return Some(Self::Off {
                should_warn: Settings::default().should_warn,
            });
        }
        None
    }

    fn configure(source: &dyn ConfigSource, env: &EnvOverrides, home: &str) -> Self {
        let settings = Settings::default().load_from(source, home);
        let config = Config::for_home(settings, home, env.uncover_dirs.clone());

        let mut required = vec![config.absolute_trash_can.as_str()];
        required.extend(config.absolute_trash_system_root.as_deref());
        for dir in required {
            if let Err(err) = dir_ok(Path::new(dir)) {
                match err {
                    DirError::Collision => {
                        tracing::warn!(dir, "trash directory is unusable and could not be fixed")
                    }
                    DirError::Io(err) => {
                        tracing::warn!(dir, error = %err, "trash directory could not be created")
                    }
                }
                return Self::failed(&config.settings);
            }
        }

        tracing::debug!(
            trash_can = %config.absolute_trash_can,
            system_root = ?config.absolute_trash_system_root,
            "session ready"
        );
        Self::Active(config)
    }

    fn failed(settings: &Settings) -> Self {
        Self::Failed {
            in_case_of_failure: settings.in_case_of_failure,
            intercept: settings.intercept,
        }
    }

    pub fn config(&self) -> Option<&Config> {
        match self {
            Self::Active(config) => Some(config),
            _ => None,
        }
    }

    /// The notice to print when the call finishes, if any.
    pub fn warning(&self) -> Option<&'static str> {
        match self {
            Self::Off { should_warn: true } => Some(DISABLED_WARNING),
            _ => None,
        }
    }
}
