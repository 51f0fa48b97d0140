use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::warn;

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];

    loop {
        let count = file
            .read(&mut buf)
            .with_context(|| format!("failed to read file for hashing: {}", path.display()))?;
        if count == 0 {
            break;
        }
        hasher.update(&buf[..count]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Writes the whole payload next to `path` and renames it into place.
pub fn write_text_atomic(path: &Path, contents: &str) -> Result<()> {
    write_all_or_nothing(&[(path, contents)])
}

/// Stages every file before any of them is renamed into place. A failure at
/// any point removes the staged files and any target already moved.
pub fn write_all_or_nothing(files: &[(&Path, &str)]) -> Result<()> {
    for (path, _) in files {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            ensure_directory(parent)?;
        }
    }

    let mut staged = Vec::with_capacity(files.len());
    for (path, contents) in files {
        match stage_file(path, contents) {
            Ok(staging) => staged.push((staging, *path)),
            Err(err) => {
                discard(staged.iter().map(|(staging, _)| staging.as_path()));
                return Err(err);
            }
        }
    }

    for (index, (staging, path)) in staged.iter().enumerate() {
        let renamed = fs::rename(staging, path).with_context(|| {
            format!(
                "failed to move {} into place at {}",
                staging.display(),
                path.display()
            )
        });
        if let Err(err) = renamed {
            discard(staged[..index].iter().map(|(_, path)| *path));
            discard(staged[index..].iter().map(|(staging, _)| staging.as_path()));
            return Err(err);
        }
    }

    Ok(())
}

fn stage_file(path: &Path, contents: &str) -> Result<PathBuf> {
    let staging = staging_path(path);
    let written = File::create(&staging)
        .with_context(|| format!("failed to create {}", staging.display()))
        .and_then(|mut file| {
            file.write_all(contents.as_bytes())
                .with_context(|| format!("failed to write {}", staging.display()))?;
            file.sync_all()
                .with_context(|| format!("failed to flush {}", staging.display()))
        });

    match written {
        Ok(()) => Ok(staging),
        Err(err) => {
            discard([staging.as_path()]);
            Err(err)
        }
    }
}

fn discard<'a>(paths: impl IntoIterator<Item = &'a Path>) {
    for path in paths {
        if let Err(err) = fs::remove_file(path)
            && err.kind() != ErrorKind::NotFound
        {
            warn!(path = %path.display(), error = %err, "failed to remove unfinished output");
        }
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    let mut data = serde_json::to_string_pretty(value).context("failed to serialize json")?;
    data.push('\n');
    Ok(data)
}
