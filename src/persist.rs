//! Artifact persistence
//!
//! Every artifact is written in two phases: the payload goes to
//! `<path>.tmp`, is fsynced, and is then renamed over `<path>`. A crash or a
//! serialization failure leaves the previous file untouched.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{CribaError, Result};

/// Sibling temp path used during a write.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `value` as pretty-printed JSON.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_vec_pretty(value).map_err(|e| CribaError::input(path, e))?;
    write_atomic(path, |w| {
        w.write_all(&data)?;
        w.write_all(b"\n")
    })
}

/// Write through `fill`, committing only if it succeeds.
pub fn write_atomic<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CribaError::input(parent, e))?;
    }

    let tmp = tmp_path(path);
    if let Err(e) = prepare_write(&tmp, fill) {
        let _ = fs::remove_file(&tmp);
        return Err(CribaError::input(path, e));
    }
    if let Err(e) = commit_rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(CribaError::input(path, e));
    }
    debug!(path = %path.display(), "wrote artifact");
    Ok(())
}

/// Phase 1: write and fsync the temp file
fn prepare_write<F>(tmp: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let mut writer = BufWriter::new(File::create(tmp)?);
    fill(&mut writer)?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

/// Phase 2: rename into place
fn commit_rename(tmp: &Path, path: &Path) -> io::Result<()> {
    fs::rename(tmp, path)
}

/// Read a JSON artifact.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| CribaError::input(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| CribaError::input(path, e))
}
