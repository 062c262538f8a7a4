//! Path, input-root and whitelist utilities

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::Whitelist;
use crate::utils::config::{DOC_PATH_PREFIX, DOC_PATH_REPLACEMENT};

/// Convert absolute path to relative path from base
pub fn path_relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    path.strip_prefix(base).ok().map(|p| p.to_path_buf())
}

/// Path as a `/`-separated string, identical on every platform (used for sorting and sharding).
pub fn path_to_key_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Check if a file should be excluded based on OS-specific hidden files
pub fn is_os_hidden_file(path: &Path) -> bool {
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        match name {
            // macOS
            ".DS_Store" | ".AppleDouble" | ".LSOverride" => true,
            // Windows
            "Thumbs.db" | "ehthumbs.db" | "Desktop.ini" => true,
            // Linux
            ".directory" => true,
            _ => {
                // macOS resource fork files start with ._
                name.starts_with("._")
            }
        }
    } else {
        false
    }
}

/// Rewrite the `/path/to` documentation prefix to the local collections directory.
pub fn resolve_input_path(input: &Path) -> PathBuf {
    match input.strip_prefix(DOC_PATH_PREFIX) {
        Ok(rest) => Path::new(DOC_PATH_REPLACEMENT).join(rest),
        Err(_) => input.to_path_buf(),
    }
}

/// Fail unless `root` exists, is a directory, and can be listed. Returns the canonical path.
pub fn check_input_root(root: &Path) -> Result<PathBuf> {
    let bad = || {
        format!(
            "Document directory {} does not exist or is not readable, please check the path",
            root.display()
        )
    };
    let meta = std::fs::metadata(root).with_context(bad)?;
    if !meta.is_dir() {
        anyhow::bail!(bad());
    }
    std::fs::read_dir(root).with_context(bad)?;
    root.canonicalize().with_context(bad)
}

/// Load a whitelist file: one document id per line, surrounding whitespace and blank lines ignored.
pub fn load_whitelist(path: &Path) -> Result<Whitelist> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read whitelist {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Format a duration as `HH:MM:SS`.
pub fn format_hms(elapsed: std::time::Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Group thousands with commas (`1234567` → `1,234,567`).
pub fn with_commas(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i).is_multiple_of(3) {
            out.push(',');
        }
        out.push(c);
    }
    out
}
