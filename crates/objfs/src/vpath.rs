//! Virtual path helpers.
//!
//! Virtual paths are `/`-separated strings rooted at `/`. They are computed
//! per call and never stored. Cleaning follows the usual lexical rules: empty
//! and `.` segments are dropped, `..` pops a segment but never climbs above the
//! root.

/// The root of every virtual path.
pub const ROOT: &str = "/";

/// Lexically clean a path into its absolute canonical form.
///
/// Relative input is treated as relative to the root.
pub fn clean(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            name => segments.push(name),
        }
    }
    if segments.is_empty() {
        return ROOT.to_string();
    }
    let mut out = String::with_capacity(path.len() + 1);
    for segment in segments {
        out.push('/');
        out.push_str(segment);
    }
    out
}

/// Join a caller-supplied name under a base directory and clean the result.
///
/// `name` is cleaned on its own first, so neither a leading `/` nor `..`
/// segments can escape `base`.
pub fn join(base: &str, name: &str) -> String {
    clean(&format!("{base}{}", clean(name)))
}

/// Whether a cleaned path is the root.
pub fn is_root(path: &str) -> bool {
    path == ROOT
}

/// Split a cleaned path into its parent directory and base name.
///
/// The parent of a top-level entry is the root; the root splits into
/// `("/", "")`.
pub fn split(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(0) => (ROOT, &path[1..]),
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => (ROOT, path),
    }
}

/// Final component of a cleaned path.
pub fn base_name(path: &str) -> &str {
    split(path).1
}
