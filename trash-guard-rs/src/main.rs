mod config_file;

use config_file::PersonalConfigFile;
use libtrash_core::{
    canonicalize, decide_action, print_size, CoreError, EnvOverrides, Interceptor, OpenCall,
    Outcome, RealFileSystem, Session,
};
use std::env;
use std::fmt::{self, Display, Formatter};
use std::io::{self, Write};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const LOG_ENV: &str = "LIBTRASH_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Remove(Vec<String>),
    Move { old: String, new: String },
    Truncate { path: String, follow: bool },
    Decide(Vec<String>),
    ShowConfig,
    PrintVersion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct GuardConfig {
    action: Action,
    verbose: bool,
}

#[derive(Debug)]
struct CliError(String);

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn print_help(prog: &str) {
    println!(
        "\
usage: {prog} [-h] [--version] [-v] COMMAND [ARGS...]

Run destructive file operations through the trash placement engine

commands:
  rm FILE...            delete files, saving a copy in the trash can first
  mv OLD NEW            rename OLD to NEW, saving the file NEW replaces
  truncate [--no-follow] FILE
                        empty FILE, saving its current content first
  decide FILE...        print what would happen to each FILE
  config                print the settings in effect

options:
  -h, --help            show this help message and exit
  --version             show program's version number and exit
  -v, --verbose         report where saved files went

environment:
  TRASH_OFF=YES         disable the engine for this run
  UNCOVER_DIRS          directories to drop from UNREMOVABLE_DIRS
  {log}          log filter (default: warn)
",
        prog = prog,
        log = LOG_ENV
    );
}

fn parse_args(args: &[String]) -> Result<GuardConfig, CliError> {
    let mut verbose = false;
    let mut follow = true;
    let mut positional: Vec<String> = Vec::new();

    for arg in args {
        match arg.as_str() {
            "--help" | "-h" => return Err(CliError("help".to_string())),
            "--version" => {
                return Ok(GuardConfig {
                    action: Action::PrintVersion,
                    verbose,
                })
            }
            "--verbose" | "-v" => verbose = true,
            "--no-follow" => follow = false,
            _ if arg.starts_with('-') && arg.len() > 1 && positional.is_empty() => {
                return Err(CliError(format!("unrecognized option '{arg}'")));
            }
            _ => positional.push(arg.clone()),
        }
    }

    let Some((command, rest)) = positional.split_first() else {
        return Err(CliError("missing command".to_string()));
    };

    let action = match (command.as_str(), rest) {
        ("rm", []) | ("decide", []) => {
            return Err(CliError(format!("{command}: missing file operand")))
        }
        ("rm", files) => Action::Remove(files.to_vec()),
        ("decide", files) => Action::Decide(files.to_vec()),
        ("mv", [old, new]) => Action::Move {
            old: old.clone(),
            new: new.clone(),
        },
        ("mv", _) => return Err(CliError("mv: expected OLD and NEW".to_string())),
        ("truncate", [path]) => Action::Truncate {
            path: path.clone(),
            follow,
        },
        ("truncate", _) => return Err(CliError("truncate: expected one FILE".to_string())),
        ("config", []) => Action::ShowConfig,
        ("config", _) => return Err(CliError("config: takes no arguments".to_string())),
        (other, _) => return Err(CliError(format!("unknown command '{other}'"))),
    };

    Ok(GuardConfig { action, verbose })
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Each operation gets a session of its own, like an intercepted call.
fn new_session(env: &EnvOverrides) -> Session {
    Session::init(&RealFileSystem, &PersonalConfigFile, env)
}

fn finish(session: &Session) {
    if let Some(warning) = session.warning() {
        eprintln!("{warning}");
    }
}

fn report(verbose: bool, path: &str, outcome: &Outcome) {
    if !verbose {
        return;
    }
    match outcome {
        Outcome::Saved(destination) => println!("saved '{}' as '{}'", path, destination.display()),
        Outcome::Removed => println!("removed '{path}'"),
        Outcome::PassedThrough => println!("passed '{path}' through"),
    }
}

fn describe(err: &CoreError) -> String {
    match err.errno() {
        0 => err.to_string(),
        errno => format!("{} ({})", err, io::Error::from_raw_os_error(errno)),
    }
}

fn remove_files(files: &[String], env: &EnvOverrides, verbose: bool) -> i32 {
    let mut status = 0;
    for file in files {
        let interceptor = Interceptor::new(new_session(env), &RealFileSystem);
        match interceptor.unlink(Path::new(file)) {
            Ok(outcome) => report(verbose, file, &outcome),
            Err(err) => {
                eprintln!("trash-guard: cannot remove '{}': {}", file, describe(&err));
                status = 1;
            }
        }
        finish(interceptor.session());
    }
    status
}

fn move_file(old: &str, new: &str, env: &EnvOverrides, verbose: bool) -> i32 {
    let interceptor = Interceptor::new(new_session(env), &RealFileSystem);
    let status = match interceptor.rename(Path::new(old), Path::new(new)) {
        Ok(outcome) => {
            report(verbose, new, &outcome);
            0
        }
        Err(err) => {
            eprintln!("trash-guard: cannot move '{}' to '{}': {}", old, new, describe(&err));
            1
        }
    };
    finish(interceptor.session());
    status
}

fn truncate_file(path: &str, follow: bool, env: &EnvOverrides, verbose: bool) -> i32 {
    let interceptor = Interceptor::new(new_session(env), &RealFileSystem);
    let status = match interceptor.open_truncate(Path::new(path), OpenCall::Open, follow) {
        Ok((outcome, mut writer)) => match writer.flush() {
            Ok(()) => {
                report(verbose, path, &outcome);
                0
            }
            Err(err) => {
                eprintln!("trash-guard: cannot truncate '{path}': {err}");
                1
            }
        },
        Err(err) => {
            eprintln!("trash-guard: cannot truncate '{}': {}", path, describe(&err));
            1
        }
    };
    finish(interceptor.session());
    status
}

fn decide_files(files: &[String], env: &EnvOverrides) -> i32 {
    let session = new_session(env);
    let Some(config) = session.config() else {
        match &session {
            Session::Off { .. } => println!("engine is off: every operation passes through"),
            _ => println!("engine failed to initialize: IN_CASE_OF_FAILURE applies"),
        }
        finish(&session);
        return 0;
    };

    let mut status = 0;
    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    for file in files {
        match canonicalize(Path::new(file), false) {
            Ok(absolute) => {
                let disposition = decide_action(&absolute, config);
                if let Err(err) = writeln!(stdout, "{disposition}\t{absolute}") {
                    tracing::error!(error = %err, "unable to write to stdout");
                    return 1;
                }
            }
            Err(err) => {
                eprintln!("trash-guard: {}: {}", file, err);
                status = 1;
            }
        }
    }
    status
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "YES"
    } else {
        "NO"
    }
}

fn show_config(env: &EnvOverrides) -> i32 {
    let session = new_session(env);
    let Some(config) = session.config() else {
        eprintln!("trash-guard: engine is not active");
        finish(&session);
        return 1;
    };
    let settings = &config.settings;
    let limit = match settings.preserve_files_larger_than_limit {
        0 => "off".to_string(),
        bytes => print_size(bytes),
    };

    let rows: [(&str, String); 25] = [
        ("TRASH_CAN", config.absolute_trash_can.clone()),
        ("IN_CASE_OF_FAILURE", settings.in_case_of_failure.to_string()),
        ("SHOULD_WARN", yes_no(settings.should_warn).into()),
        ("IGNORE_HIDDEN", yes_no(settings.ignore_hidden).into()),
        ("IGNORE_EDITOR_BACKUP", yes_no(settings.ignore_editor_backup).into()),
        ("IGNORE_EDITOR_TEMPORARY", yes_no(settings.ignore_editor_temporary).into()),
        ("PROTECT_TRASH", yes_no(settings.protect_trash).into()),
        ("GLOBAL_PROTECTION", yes_no(settings.global_protection).into()),
        (
            "TRASH_SYSTEM_ROOT",
            config.absolute_trash_system_root.clone().unwrap_or_default(),
        ),
        ("TEMPORARY_DIRS", settings.temporary_dirs.to_string()),
        ("USER_TEMPORARY_DIRS", config.user_temporary_dirs.to_string()),
        ("UNREMOVABLE_DIRS", settings.unremovable_dirs.to_string()),
        ("UNCOVER_DIRS", config.uncovered_dirs.clone().unwrap_or_default()),
        ("IGNORE_EXTENSIONS", settings.ignore_extensions.to_string()),
        ("INTERCEPT_UNLINK", yes_no(settings.intercept.unlink).into()),
        ("INTERCEPT_RENAME", yes_no(settings.intercept.rename).into()),
        ("INTERCEPT_FOPEN", yes_no(settings.intercept.fopen).into()),
        ("INTERCEPT_FREOPEN", yes_no(settings.intercept.freopen).into()),
        ("INTERCEPT_OPEN", yes_no(settings.intercept.open).into()),
        (
            "LIBTRASH_CONFIG_FILE_UNREMOVABLE",
            yes_no(settings.libtrash_config_file_unremovable).into(),
        ),
        (
            "REMOVABLE_MEDIA_MOUNT_POINTS",
            settings.removable_media_mount_points.to_string(),
        ),
        ("EXCEPTIONS", settings.exceptions.to_string()),
        ("IGNORE_RE", settings.ignore_re.to_string()),
        ("PRESERVE_FILES_LARGER_THAN", limit),
        ("HOME", config.home.clone()),
    ];

    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    for (key, value) in rows {
        if let Err(err) = writeln!(stdout, "{key:<34}{value}") {
            tracing::error!(error = %err, "unable to write to stdout");
            return 1;
        }
    }
    0
}

fn run() -> i32 {
    let args: Vec<String> = env::args().skip(1).collect();
    let program = env::args().next().unwrap_or_else(|| "trash-guard".to_string());

    let config = match parse_args(&args) {
        Ok(config) => config,
        Err(error) if error.0 == "help" => {
            print_help(&program);
            return 0;
        }
        Err(error) => {
            eprintln!("trash-guard: {}", error);
            return 2;
        }
    };

    init_logging();
    let overrides = EnvOverrides::from_env();

    match config.action {
        Action::PrintVersion => {
            println!("trash-guard {}", VERSION);
            0
        }
        Action::Remove(files) => remove_files(&files, &overrides, config.verbose),
        Action::Move { old, new } => move_file(&old, &new, &overrides, config.verbose),
        Action::Truncate { path, follow } => {
            truncate_file(&path, follow, &overrides, config.verbose)
        }
        Action::Decide(files) => decide_files(&files, &overrides),
        Action::ShowConfig => show_config(&overrides),
    }
}

fn main() {
    std::process::exit(run());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_rm_with_verbose_flag() {
        let config = parse_args(&args(&["-v", "rm", "a", "b"])).unwrap();
        assert!(config.verbose);
        assert_eq!(
            config.action,
            Action::Remove(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn parses_truncate_without_following() {
        let config = parse_args(&args(&["truncate", "--no-follow", "f"])).unwrap();
        assert_eq!(
            config.action,
            Action::Truncate {
                path: "f".to_string(),
                follow: false
            }
        );
    }

    #[test]
    fn rejects_bad_arity_and_unknown_commands() {
        assert!(parse_args(&args(&["mv", "only-one"])).is_err());
        assert!(parse_args(&args(&["rm"])).is_err());
        assert!(parse_args(&args(&["shred", "x"])).is_err());
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["--frobnicate", "rm", "x"])).is_err());
    }

    #[test]
    fn file_names_after_the_command_may_start_with_a_dash() {
        let config = parse_args(&args(&["rm", "-odd-name"])).unwrap();
        assert_eq!(config.action, Action::Remove(vec!["-odd-name".to_string()]));
    }

    #[test]
    fn help_is_reported_as_a_sentinel() {
        let err = parse_args(&args(&["--help"])).unwrap_err();
        assert_eq!(err.0, "help");
    }
}
