use libtrash_core::settings::{ConfigSource, RawValues, CONFIG_KEYS};
use libtrash_core::PERSONAL_CONF_FILE;
use std::fs::read_to_string;
use std::path::Path;

/// The personal `KEY = VALUE` file in the user's home directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct PersonalConfigFile;

impl ConfigSource for PersonalConfigFile {
    fn load(&self, home: &str) -> Option<RawValues> {
        let path = Path::new(home).join(PERSONAL_CONF_FILE);
        match read_to_string(&path) {
            Ok(content) => Some(parse_config(&content)),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "no personal configuration");
                None
            }
        }
    }
}

/// Parses `KEY = VALUE` lines.
///
/// Lines starting with `#` and lines without `=` are skipped. The key ends
/// at the first space or at `=`; the value is the first whitespace-free
/// token after `=`, possibly empty. A later line wins over an earlier one.
pub fn parse_config(content: &str) -> RawValues {
    let mut values = RawValues::new();

    for line in content.lines() {
        if line.starts_with('#') {
            continue;
        }
        let Some(equal_sign) = line.find('=') else {
            continue;
        };
        let key_start = line.len() - line.trim_start().len();
        if key_start >= equal_sign {
            continue;
        }

        let key_area = &line[key_start..equal_sign];
        let key = match key_area.find(' ') {
            Some(space) => &key_area[..space],
            None => key_area,
        };
        if !CONFIG_KEYS.contains(&key) {
            continue;
        }

        let value = line[equal_sign + 1..]
            .split_whitespace()
            .next()
            .unwrap_or_default();
        values.insert(key.to_string(), value.to_string());
    }

    values
}
