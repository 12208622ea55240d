//! Shared helpers for output generation.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

/// Write bytes to `path` through a temporary sibling file and a rename.
///
/// A failed write leaves no file at `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{file_name}.tmp"));

    let written = File::create(&temp_path)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .with_context(|| format!("write {}", temp_path.display()));
    if let Err(error) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(error);
    }
    fs::rename(&temp_path, path).with_context(|| {
        format!("rename {} to {}", temp_path.display(), path.display())
    })?;
    Ok(())
}

/// Cell text safe for a tab-delimited file: tabs and line breaks become spaces.
pub fn sanitize_cell(value: &str) -> String {
    if value.contains(['\t', '\n', '\r']) {
        value.replace(['\t', '\n', '\r'], " ")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_separators() {
        assert_eq!(sanitize_cell("a\tb\nc"), "a b c");
        assert_eq!(sanitize_cell("plain"), "plain");
    }
}
