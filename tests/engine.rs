use libtrash_core::settings::parse_size_limit;
use libtrash_core::{
    decide_action, graft_into_trash, AbsolutePath, Config, CoreError, Disposition, EnvOverrides,
    FileSystem, Interceptor, Outcome, RawValues, RealFileSystem, Session, Settings,
};
use std::borrow::Cow;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};

struct Sandbox {
    _dir: TempDir,
    home: PathBuf,
}

impl Sandbox {
    fn new() -> Self {
        let dir = Builder::new()
            .prefix("engine")
            .tempdir()
            .expect("Failed to create temp dir");
        let home = fs::canonicalize(dir.path()).unwrap().join("home");
        fs::create_dir(&home).unwrap();
        Self { _dir: dir, home }
    }

    fn home_str(&self) -> &str {
        self.home.to_str().unwrap()
    }

    fn session(&self) -> Session {
        let values: RawValues = [("TEMPORARY_DIRS".to_string(), String::new())]
            .into_iter()
            .collect();
        Session::init_for_home(
            &RealFileSystem,
            &values,
            &EnvOverrides::default(),
            self.home_str(),
        )
    }

    fn config(&self) -> Config {
        self.session()
            .config()
            .cloned()
            .expect("session should be active")
    }

    fn file(&self, relative: &str, contents: &[u8]) -> AbsolutePath {
        let path = self.home.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        AbsolutePath::try_from(path).unwrap()
    }
}

/// Renames always cross devices.
struct OtherDevice;

impl FileSystem for OtherDevice {
    fn remove_file(&self, path: &Path) -> libtrash_core::Result<()> {
        RealFileSystem.remove_file(path)
    }

    fn rename(&self, from: &Path, _to: &Path) -> libtrash_core::Result<()> {
        Err(CoreError::io(from, io::Error::from_raw_os_error(libc::EXDEV)))
    }

    fn open_read(&self, path: &Path) -> libtrash_core::Result<Box<dyn Read>> {
        RealFileSystem.open_read(path)
    }

    fn open_write(&self, path: &Path, follow: bool) -> libtrash_core::Result<Box<dyn Write>> {
        RealFileSystem.open_write(path, follow)
    }
}

#[test]
fn empty_file_outside_special_lists_is_removed() {
    let sandbox = Sandbox::new();
    let config = sandbox.config();
    let path = sandbox.file("blank.txt", b"");
    assert_eq!(decide_action(&path, &config), Disposition::Remove);
}

#[test]
fn file_in_unremovable_dir_is_left_untouched() {
    let sandbox = Sandbox::new();
    let mut config = sandbox.config();
    let protected = sandbox.home.join("system");
    config.settings.unremovable_dirs = Cow::Owned(protected.to_str().unwrap().to_string());
    let path = sandbox.file("system/kernel.img", b"bits");

    assert_eq!(decide_action(&path, &config), Disposition::LeaveUntouched);
}

#[test]
fn saved_file_moves_to_relative_location_in_trash_can() {
    let sandbox = Sandbox::new();
    let config = sandbox.config();
    let path = sandbox.file("projects/site/index.html", b"<html>");

    assert_eq!(decide_action(&path, &config), Disposition::Save);
    let destination = graft_into_trash(&RealFileSystem, &config, &path).unwrap();

    let expected = Path::new(&config.absolute_trash_can).join("projects/site/index.html");
    assert_eq!(destination, expected);
    assert_eq!(fs::read(&expected).unwrap(), b"<html>");
    assert!(!path.as_path().exists());
}

#[test]
fn repeated_saves_never_overwrite() {
    let sandbox = Sandbox::new();
    let config = sandbox.config();
    let trash = PathBuf::from(&config.absolute_trash_can);

    for round in 0..3u8 {
        let path = sandbox.file("log.txt", &[b'a' + round]);
        graft_into_trash(&RealFileSystem, &config, &path).unwrap();
    }

    assert_eq!(fs::read(trash.join("log.txt")).unwrap(), b"a");
    assert_eq!(fs::read(trash.join("log.txt[1]")).unwrap(), b"b");
    assert_eq!(fs::read(trash.join("log.txt[2]")).unwrap(), b"c");
}

#[test]
fn files_outside_home_go_below_the_system_root() {
    let sandbox = Sandbox::new();
    let config = sandbox.config();
    let outside_dir = sandbox.home.parent().unwrap().join("srv");
    fs::create_dir(&outside_dir).unwrap();
    let outside = outside_dir.join("data.csv");
    fs::write(&outside, b"1,2,3").unwrap();
    let path = AbsolutePath::try_from(outside.clone()).unwrap();

    let destination = graft_into_trash(&RealFileSystem, &config, &path).unwrap();

    let root = config.absolute_trash_system_root.clone().unwrap();
    assert_eq!(destination, PathBuf::from(format!("{}{}", root, path)));
    assert!(!outside.exists());
}

#[test]
fn cross_device_save_copies_and_removes_original() {
    let sandbox = Sandbox::new();
    let config = sandbox.config();
    let path = sandbox.file("photos/cat.jpg", &[7u8; 4096]);

    let destination = graft_into_trash(&OtherDevice, &config, &path).unwrap();

    assert_eq!(fs::read(&destination).unwrap(), vec![7u8; 4096]);
    assert!(!path.as_path().exists());
}

#[test]
fn size_limit_strings_follow_binary_units() {
    assert_eq!(parse_size_limit("10M"), Some(10_485_760));
    assert_eq!(parse_size_limit("1G"), Some(1_073_741_824));
    for bad in ["-5M", "10X", ""] {
        let values: RawValues = [("PRESERVE_FILES_LARGER_THAN".to_string(), bad.to_string())]
            .into_iter()
            .collect();
        assert_eq!(
            Settings::default()
                .merge(&values)
                .preserve_files_larger_than_limit,
            0
        );
    }
}

#[test]
fn interceptor_runs_a_whole_unlink_call() {
    let sandbox = Sandbox::new();
    let path = sandbox.file("thesis/chapter1.tex", b"\\section{Intro}");
    let interceptor = Interceptor::new(sandbox.session(), &RealFileSystem);

    let outcome = interceptor.unlink(path.as_path()).unwrap();

    let expected = sandbox.home.join("Trash/thesis/chapter1.tex");
    assert_eq!(outcome, Outcome::Saved(expected.clone()));
    assert!(expected.exists());
}

#[test]
fn trash_can_contents_are_destroyed_for_good_when_unprotected() {
    let sandbox = Sandbox::new();
    let values: RawValues = [
        ("TEMPORARY_DIRS".to_string(), String::new()),
        ("PROTECT_TRASH".to_string(), "NO".to_string()),
    ]
    .into_iter()
    .collect();
    let session = Session::init_for_home(
        &RealFileSystem,
        &values,
        &EnvOverrides::default(),
        sandbox.home_str(),
    );
    let stale = sandbox.file("Trash/old.txt", b"old");
    let interceptor = Interceptor::new(session, &RealFileSystem);

    assert_eq!(interceptor.unlink(stale.as_path()).unwrap(), Outcome::Removed);
    assert!(!stale.as_path().exists());
}
