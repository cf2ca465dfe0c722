//! Crash-safe file replacement.
//!
//! Contents are written to a sibling file with a fixed `.tmp` suffix, synced, and only
//! then renamed over the canonical path. Rename within one directory is atomic, so
//! readers see either the old file or the new one, never a partial write.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const TMP_SUFFIX: &str = ".tmp";

/// Temporary path used while replacing `path`: same directory, `.tmp` appended.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(TMP_SUFFIX);
    path.with_file_name(name)
}

/// A fully written temporary file waiting to be renamed into place.
///
/// Dropping it without calling [`StagedWrite::commit`] removes the temporary file and
/// leaves the canonical path untouched.
#[derive(Debug)]
pub struct StagedWrite {
    tmp: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedWrite {
    /// Write `contents` to the temporary sibling of `target` and sync it to disk.
    pub fn stage(target: &Path, contents: &[u8]) -> io::Result<Self> {
        let tmp = tmp_path(target);
        let staged = StagedWrite { tmp, target: target.to_path_buf(), committed: false };
        let mut f = File::create(&staged.tmp)?;
        f.write_all(contents)?;
        f.sync_all()?;
        drop(f);
        Ok(staged)
    }

    pub fn tmp_path(&self) -> &Path {
        &self.tmp
    }

    /// Rename the temporary file over the target.
    pub fn commit(mut self) -> io::Result<()> {
        fs::rename(&self.tmp, &self.target)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.tmp);
        }
    }
}

/// Replace `path` with `contents` via a staged write.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    StagedWrite::stage(path, contents)?.commit()
}
