//! Filesystem infrastructure: implements `ReportStore`.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::ReportStore;
use crate::domain::ReportDeliveryError;

/// Writes reports as files under a single directory.
pub struct FsReportStore {
    dir: PathBuf,
}

impl FsReportStore {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Default reports directory: `reports/` next to the running executable.
///
/// # Errors
///
/// Returns an error if the executable path cannot be determined.
pub fn default_report_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot determine executable path")?;
    let parent = exe
        .parent()
        .ok_or_else(|| anyhow::anyhow!("executable path has no parent: {}", exe.display()))?;
    Ok(parent.join("reports"))
}

impl ReportStore for FsReportStore {
    async fn write_report(
        &self,
        file_name: &str,
        html: &str,
    ) -> Result<PathBuf, ReportDeliveryError> {
        let dir = self.dir.clone();
        let name = file_name.to_string();
        let html = html.to_string();
        let target = self.dir.join(file_name);
        tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&dir)?;
            write_new(&dir, &name, html.as_bytes())
        })
        .await
        .map_err(|e| ReportDeliveryError::Write {
            path: target.display().to_string(),
            reason: format!("spawn_blocking panicked: {e}"),
        })?
        .map_err(|e| ReportDeliveryError::Write {
            path: target.display().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Highest numeric suffix tried before giving up on a free file name.
const MAX_NAME_SUFFIX: u32 = 100;

/// Create `file_name` in `dir` without replacing an existing file. If the
/// name is taken, `stem-1.ext`, `stem-2.ext`, ... are tried in turn.
fn write_new(dir: &Path, file_name: &str, contents: &[u8]) -> std::io::Result<PathBuf> {
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{ext}")),
        None => (file_name, String::new()),
    };
    for n in 0..=MAX_NAME_SUFFIX {
        let candidate = if n == 0 {
            dir.join(file_name)
        } else {
            dir.join(format!("{stem}-{n}{ext}"))
        };
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(mut file) => {
                file.write_all(contents)?;
                return Ok(candidate);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e),
        }
    }
    Err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free report name for {file_name}"),
    ))
}
