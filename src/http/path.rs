//! Request path handling
//!
//! Percent-decoding and lexical cleaning of URL paths, plus encoding of
//! file names back into link targets.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// Bytes escaped when a file name is used as a relative URL
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}')
    .add(b'/');

/// Percent-decode a raw URL path, always returning a rooted path.
///
/// Returns `None` when the decoded bytes are not valid UTF-8.
pub fn decode_path(raw: &str) -> Option<String> {
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    if decoded.starts_with('/') {
        Some(decoded.into_owned())
    } else {
        Some(format!("/{decoded}"))
    }
}

/// Lexically clean a rooted path: collapse slashes, drop `.` segments and
/// resolve `..` without ever climbing above `/`.
///
/// # Examples
/// ```
/// use imgdrop::http::path::clean_path;
/// assert_eq!(clean_path("/a/./b/../c/"), "/a/c");
/// assert_eq!(clean_path("/../../etc/passwd"), "/etc/passwd");
/// ```
pub fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Encode a single file name as a relative link target
pub fn encode_segment(name: &str) -> String {
    let encoded = utf8_percent_encode(name, SEGMENT).to_string();
    // "a:b" would otherwise parse as a URL with scheme "a"
    if encoded.split('/').next().is_some_and(|first| first.contains(':')) {
        format!("./{encoded}")
    } else {
        encoded
    }
}

/// Last segment of a path, ignoring a trailing slash
pub fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}
