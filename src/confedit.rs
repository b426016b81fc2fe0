//! Directive-level editing of daemon configuration files.
//!
//! SSH hardening and the runtime/database tuning steps all rewrite single
//! directives inside files they do not own. The editing rules here keep
//! those rewrites idempotent:
//!
//! - a directive is set-or-replace: the first matching line (commented or
//!   not) is replaced with the canonical form, later duplicates are
//!   dropped, and only a missing directive is appended
//! - named blocks are appended exactly once, keyed by a marker line
//! - files are only written when the content actually changed, and the
//!   original is backed up with a timestamp before the first write
//!
//! The string transformations are pure; the thin file wrappers at the
//! bottom add I/O.

use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;

use crate::error::WebstrapError;

/// Sets a space-separated directive (sshd style: `PermitRootLogin no`).
///
/// Matches the directive name at line start, optionally commented out.
/// The first match is replaced, further matches are removed, so repeated
/// application never duplicates a directive.
pub fn set_directive(content: &str, key: &str, value: &str) -> String {
    let pattern = format!(r"(?mi)^[ \t]*#?[ \t]*{}([ \t]+.*)?$", regex::escape(key));
    set_by_pattern(content, &pattern, &format!("{} {}", key, value))
}

/// Sets an ini-style option (php.ini style: `display_errors = Off`).
///
/// Matches `key = anything`, optionally commented with `;` or `#`.
pub fn set_ini_option(content: &str, key: &str, value: &str) -> String {
    let pattern = format!(r"(?mi)^[ \t]*[;#]?[ \t]*{}[ \t]*=.*$", regex::escape(key));
    set_by_pattern(content, &pattern, &format!("{} = {}", key, value))
}

/// Sets a key=value option without spaces (vsftpd style: `write_enable=YES`).
///
/// vsftpd rejects whitespace around the separator, so the canonical form
/// differs from [`set_ini_option`].
pub fn set_kv_option(content: &str, key: &str, value: &str) -> String {
    let pattern = format!(r"(?mi)^[ \t]*[;#]?[ \t]*{}[ \t]*=.*$", regex::escape(key));
    set_by_pattern(content, &pattern, &format!("{}={}", key, value))
}

/// Applies [`set_directive`] for every pair in order.
pub fn set_directives(content: &str, directives: &[(&str, String)]) -> String {
    directives.iter().fold(content.to_string(), |acc, (key, value)| {
        set_directive(&acc, key, value)
    })
}

/// Appends `block` to the content unless the marker line is already
/// present. The marker is written as the first line of the block, so the
/// second application sees it and leaves the file untouched.
pub fn append_block_once(content: &str, marker: &str, block: &str) -> String {
    if content.lines().any(|line| line.trim() == marker) {
        return content.to_string();
    }
    let mut out = content.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(marker);
    out.push('\n');
    out.push_str(block);
    if !block.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn set_by_pattern(content: &str, pattern: &str, canonical: &str) -> String {
    let re = Regex::new(pattern).expect("directive pattern must compile");

    if re.find(content).is_none() {
        let mut out = content.to_string();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(canonical);
        out.push('\n');
        return out;
    }

    // First occurrence becomes the canonical line, duplicates are dropped.
    let mut replaced = false;
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let mut out = String::with_capacity(content.len() + canonical.len());
    for line in lines {
        let bare = line.strip_suffix('\n').unwrap_or(line);
        if re.is_match(bare) {
            if !replaced {
                out.push_str(canonical);
                out.push('\n');
                replaced = true;
            }
        } else {
            out.push_str(line);
        }
    }
    out
}

/// Copies the file aside with a timestamp suffix before the first rewrite.
pub fn backup_file(path: &Utf8Path) -> Result<Utf8PathBuf, WebstrapError> {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let backup = Utf8PathBuf::from(format!("{}.bak-{}", path, stamp));
    fs::copy(path, &backup).map_err(|e| WebstrapError::io(path.to_string(), e))?;
    tracing::info!("backed up {} to {}", path, backup);
    Ok(backup)
}

/// Rewrites the file through the given transformation.
///
/// Reads, transforms, and writes only when the result differs; when it
/// does, the original is backed up first. Returns whether a write
/// happened, letting callers decide if the owning service needs a reload.
pub fn edit_file(
    path: &Utf8Path,
    transform: impl FnOnce(&str) -> String,
) -> Result<bool, WebstrapError> {
    let original =
        fs::read_to_string(path).map_err(|e| WebstrapError::io(path.to_string(), e))?;
    let updated = transform(&original);
    if updated == original {
        tracing::debug!("no changes needed: {}", path);
        return Ok(false);
    }
    backup_file(path)?;
    fs::write(path, updated).map_err(|e| WebstrapError::io(path.to_string(), e))?;
    tracing::info!("updated {}", path);
    Ok(true)
}
