//! Per-run temporary directories

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use bulkflow_format::Result;
use chrono::Utc;
use tempfile::TempDir;
use tracing::{debug, warn};

/// Fallback base directory when the platform reports none.
const DEFAULT_TEMP_DIR: &str = "/tmp";

/// Prefix every space directory starts with.
const SPACE_DIR_PREFIX: &str = "bulkflow";

/// `strftime` layout of ISO 8601 basic UTC timestamps, e.g. `20240102T030405Z`.
const ISO8601_BASIC: &str = "%Y%m%dT%H%M%SZ";

/// Hands out fresh temporary directories under one base
#[derive(Debug, Clone)]
pub struct TempSpaceAllocator {
    base: PathBuf,
}

impl Default for TempSpaceAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl TempSpaceAllocator {
    /// Root spaces at the platform temp directory.
    pub fn new() -> Self {
        let base = std::env::temp_dir();
        if base.as_os_str().is_empty() {
            warn!("temp directory is not set, falling back to {DEFAULT_TEMP_DIR}");
            return Self::with_base(DEFAULT_TEMP_DIR);
        }
        Self { base }
    }

    /// Root spaces at `base`.
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Directory new spaces are created in.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Create a space named after `prefix`, normally an ISO 8601 basic
    /// timestamp. Other prefixes are accepted with a warning.
    pub fn new_space(&self, prefix: &str) -> Result<TempSpace> {
        if !is_iso8601_basic(prefix) {
            warn!(prefix, "temp space prefix should be an ISO 8601 basic timestamp");
        }
        let name = format!("{SPACE_DIR_PREFIX}{}", sanitize(prefix));
        let dir = tempfile::Builder::new().prefix(&name).tempdir_in(&self.base)?;
        debug!(path = %dir.path().display(), "created temp space");
        Ok(TempSpace { dir })
    }

    /// Create a space named after the current UTC time.
    pub fn new_space_now(&self) -> Result<TempSpace> {
        self.new_space(&Utc::now().format(ISO8601_BASIC).to_string())
    }
}

/// `/` and `:` cannot appear in file names on every platform.
fn sanitize(prefix: &str) -> String {
    prefix.replace(['/', ':'], "-")
}

fn is_iso8601_basic(prefix: &str) -> bool {
    let bytes = prefix.as_bytes();
    bytes.len() == 16
        && bytes[..8].iter().all(u8::is_ascii_digit)
        && bytes[8] == b'T'
        && bytes[9..15].iter().all(u8::is_ascii_digit)
        && bytes[15] == b'Z'
}

/// A temporary directory removed on drop
#[derive(Debug)]
pub struct TempSpace {
    dir: TempDir,
}

impl TempSpace {
    /// Location of the directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create an empty file inside the space and return its path.
    pub fn create_temp_file(&self, prefix: &str, suffix: &str) -> Result<PathBuf> {
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(self.dir.path())?;
        let (_, path): (File, PathBuf) = file.keep().map_err(io::Error::from)?;
        Ok(path)
    }

    /// Remove the directory and everything in it now.
    pub fn cleanup(self) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }
}
