//! Trash placement engine.
//! Decides whether a destructive file operation should destroy a file, save
//! a copy in the user's trash can first, or be refused, and performs the
//! placement. Interception glue drives it through [`Interceptor`].

pub mod errors;
pub mod fs;
pub mod graft;
pub mod helpers;
pub mod identity;
pub mod intercept;
pub mod models;
pub mod movefile;
pub mod policy;
pub mod session;
pub mod settings;

pub use errors::{CoreError, GraftError, MoveError, Result};
pub use fs::{FileSystem, RealFileSystem, RealOp};
pub use graft::{graft, graft_into_trash};
pub use helpers::{
    absolute_from_dirfd,
    canonicalize,
    contains_path,
    has_ignored_extension,
    is_exception,
    is_hidden,
    matches_pattern,
    print_size,
    sanitize_user_path,
};
pub use intercept::Interceptor;
pub use models::{
    AbsolutePath,
    Config,
    Disposition,
    FailurePolicy,
    InterceptToggles,
    OpenCall,
    Outcome,
    PERSONAL_CONF_FILE,
};
pub use movefile::manual_move;
pub use policy::decide_action;
pub use session::Session;
pub use settings::{ConfigSource, EnvOverrides, NoConfig, RawValues, Settings};

/// Re-export a small stable API surface for glue crates.
pub mod prelude {
    pub use crate::{
        errors::{CoreError, Result},
        fs::{FileSystem, RealFileSystem},
        helpers::*,
        intercept::Interceptor,
        models::*,
        policy::decide_action,
        session::Session,
        settings::{ConfigSource, EnvOverrides, RawValues, Settings},
    };
}
