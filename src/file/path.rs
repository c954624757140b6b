//! Path derivation from tree positions.
//!
//! Everything here is pure: callers pass the ancestor chain of a directory
//! (top-down, the directory itself last) as loaded from the metadata store.
//!
//! Two kinds of path come out of a chain:
//! - storage paths, built from directory ids, which key blobs on disk and
//!   never collide between same-named siblings;
//! - display paths, built from directory names, for people only.

use super::Directory;

/// Separator used in both storage and display paths.
pub const SEPARATOR: &str = "/";

/// Relative storage path of a directory's physical folder.
///
/// An empty chain is the blob root itself and yields `""`.
pub fn directory_path(chain: &[Directory]) -> String {
    chain
        .iter()
        .map(|d| d.id.to_string())
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Relative storage path of a blob named `leaf` inside the chain's last directory.
///
/// `leaf` must already be a storage leaf (see [`storage_leaf`]).
pub fn storage_path(chain: &[Directory], leaf: &str) -> String {
    let dir = directory_path(chain);
    if dir.is_empty() {
        leaf.to_string()
    } else {
        format!("{dir}{SEPARATOR}{leaf}")
    }
}

/// Human-facing path built from the names along the chain, optionally ending in `leaf`.
pub fn display_path(chain: &[Directory], leaf: Option<&str>) -> String {
    chain
        .iter()
        .map(|d| d.name.as_str())
        .chain(leaf)
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Append one name to a display path.
pub fn join_display(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}{SEPARATOR}{name}")
    }
}

/// Clean an uploaded file name for use as a path segment.
///
/// Runs of whitespace become a single `_`; path separators and control
/// characters are dropped. Returns `None` if nothing usable remains.
pub fn sanitize_name(name: &str) -> Option<String> {
    let mut out = String::with_capacity(name.len());
    let mut in_whitespace = false;

    for c in name.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
                in_whitespace = true;
            }
            continue;
        }
        in_whitespace = false;
        if c == '/' || c == '\\' || c.is_control() {
            continue;
        }
        out.push(c);
    }

    if out.is_empty() || out == "." || out == ".." {
        None
    } else {
        Some(out)
    }
}

/// Sanitize `name` into the leaf used inside the blob root.
///
/// Directory folders are named by numeric id and the staging area starts
/// with a dot, so leaves that are all digits or start with `.` get a `_`
/// prefix to keep blobs and folders from ever sharing a path.
pub fn storage_leaf(name: &str) -> Option<String> {
    let clean = sanitize_name(name)?;
    if clean.starts_with('.') || clean.bytes().all(|b| b.is_ascii_digit()) {
        Some(format!("_{clean}"))
    } else {
        Some(clean)
    }
}
