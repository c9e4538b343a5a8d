//! Copy-then-delete move, used when a rename would cross devices.

use crate::errors::{CoreError, MoveError};
use crate::fs::FileSystem;
use crate::identity::{can_write_to_dir, WriteAccess};
use std::io::{self, Write};
use std::path::Path;

fn into_io(err: CoreError) -> io::Error {
    match err {
        CoreError::Io(_, err) => err,
        other => io::Error::other(other.to_string()),
    }
}

/// Moves `source` to `destination` by copying its bytes and then removing
/// the original.
///
/// The directory holding `source` must be writable by the effective
/// identity before anything is copied, otherwise the copy could succeed and
/// the removal fail, leaving two files behind. An inconclusive probe lets
/// the move go ahead. A failed copy leaves the original untouched.
pub fn manual_move(
    filesystem: &dyn FileSystem,
    source: &Path,
    destination: &Path,
) -> Result<(), MoveError> {
    match can_write_to_dir(source) {
        Ok(WriteAccess::Allowed) => {}
        Ok(WriteAccess::Inconclusive) => {
            tracing::warn!(source = %source.display(), "write access unknown, copying anyway");
        }
        Ok(WriteAccess::Denied(err)) => return Err(MoveError::classify(source, err)),
        Err(err) => {
            return Err(MoveError::other(source, io::Error::other(err.to_string())));
        }
    }

    let mut reader = filesystem.open_read(source).map_err(|err| {
        let err = into_io(err);
        if err.raw_os_error() == Some(libc::EACCES) {
            MoveError::Denied {
                path: source.into(),
                source: err,
            }
        } else {
            MoveError::other(source, err)
        }
    })?;

    let mut writer = filesystem
        .open_write(destination, false)
        .map_err(|err| MoveError::other(destination, into_io(err)))?;

    let copied = io::copy(&mut reader, &mut writer).and_then(|bytes| {
        writer.flush()?;
        Ok(bytes)
    });
    drop(writer);

    let bytes = match copied {
        Ok(bytes) => bytes,
        Err(err) => {
            if let Err(cleanup) = filesystem.remove_file(destination) {
                tracing::debug!(
                    destination = %destination.display(),
                    error = %cleanup,
                    "could not remove partial copy"
                );
            }
            return Err(MoveError::other(destination, err));
        }
    };

    filesystem
        .remove_file(source)
        .map_err(|err| MoveError::classify(source, into_io(err)))?;

    tracing::debug!(
        source = %source.display(),
        destination = %destination.display(),
        bytes,
        "copied across devices"
    );
    Ok(())
}
