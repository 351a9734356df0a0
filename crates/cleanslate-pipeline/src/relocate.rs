//! Filesystem helpers for the relocate stage.
//!
//! # Design
//! - The destination name is reserved with `create_new`, which refuses to
//!   replace an existing entry, so concurrent runs never overwrite each other.
//! - On one filesystem the source is renamed over its reservation: a single
//!   step after which the file exists only in the output directory.
//! - Across filesystems the file is copied to a hidden partial name inside the
//!   output directory, synced, renamed over the reservation, and only then is
//!   the source removed.
//! - A failed move removes the reservation and leaves the source in place.

use std::ffi::OsStr;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{PipelineError, PipelineResult};

const MAX_NAME_CONFLICTS: usize = 10_000;

/// Move `source` into `output_dir`, returning the final path.
pub(crate) fn relocate(source: &Path, output_dir: &Path, run_id: Uuid) -> PipelineResult<PathBuf> {
    fs::create_dir_all(output_dir)
        .map_err(|err| PipelineError::io("create_output_dir", output_dir, err))?;
    let file_name = source
        .file_name()
        .ok_or_else(|| PipelineError::NotAFile {
            path: source.to_path_buf(),
        })?;

    let destination = reserve_unique(output_dir, file_name)
        .map_err(|err| PipelineError::io("reserve_destination", output_dir, err))?;
    match fs::rename(source, &destination) {
        Ok(()) => Ok(destination),
        Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
            debug!(
                source = %source.display(),
                "source on another filesystem; copying into output directory"
            );
            copy_over(source, &destination, run_id).inspect_err(|_| release(&destination))?;
            if let Err(err) = fs::remove_file(source) {
                release(&destination);
                return Err(PipelineError::io("remove_source", source, err));
            }
            Ok(destination)
        }
        Err(err) => {
            release(&destination);
            Err(PipelineError::io("rename_into_output", source, err))
        }
    }
}

fn release(reservation: &Path) {
    if let Err(err) = fs::remove_file(reservation) {
        warn!(
            destination = %reservation.display(),
            error = %err,
            "failed to release destination reservation"
        );
    }
}

fn copy_over(source: &Path, destination: &Path, run_id: Uuid) -> PipelineResult<()> {
    let dir = destination.parent().unwrap_or_else(|| Path::new("."));
    let file_name = destination
        .file_name()
        .map(OsStr::to_string_lossy)
        .unwrap_or_default();
    let partial = dir.join(format!(".{file_name}.{run_id}.partial"));
    let staged = fs::copy(source, &partial)
        .and_then(|_| File::open(&partial))
        .and_then(|file| file.sync_all())
        .and_then(|()| fs::rename(&partial, destination));
    if let Err(err) = staged {
        let _ = fs::remove_file(&partial);
        return Err(PipelineError::io("copy_to_output", &partial, err));
    }
    Ok(())
}

/// Create an empty placeholder at the first free candidate name.
fn reserve_unique(dir: &Path, file_name: &OsStr) -> io::Result<PathBuf> {
    for index in 0..MAX_NAME_CONFLICTS {
        let candidate = candidate_name(dir, file_name, index);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(_) => return Ok(candidate),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
            Err(err) => return Err(err),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "no free destination name",
    ))
}

/// `photo.jpg`, `photo_1.jpg`, `photo_2.jpg`, ...
pub(crate) fn candidate_name(dir: &Path, file_name: &OsStr, index: usize) -> PathBuf {
    if index == 0 {
        return dir.join(file_name);
    }
    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map_or_else(|| file_name.to_string_lossy(), OsStr::to_string_lossy);
    match name.extension() {
        Some(ext) => dir.join(format!("{stem}_{index}.{}", ext.to_string_lossy())),
        None => dir.join(format!("{stem}_{index}")),
    }
}

/// Hex SHA-256 of the file contents.
pub(crate) fn content_sha256(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
