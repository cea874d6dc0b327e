//! MIME type detection module
//!
//! Maps file extensions to Content-Type values for static serving.

const EXTENSION_TYPES: &[(&str, &str)] = &[
    // Images
    ("avif", "image/avif"),
    ("bmp", "image/bmp"),
    ("gif", "image/gif"),
    ("ico", "image/x-icon"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("png", "image/png"),
    ("svg", "image/svg+xml"),
    ("webp", "image/webp"),
    // Text
    ("css", "text/css; charset=utf-8"),
    ("htm", "text/html; charset=utf-8"),
    ("html", "text/html; charset=utf-8"),
    ("js", "text/javascript; charset=utf-8"),
    ("mjs", "text/javascript; charset=utf-8"),
    ("json", "application/json"),
    ("md", "text/plain; charset=utf-8"),
    ("txt", "text/plain; charset=utf-8"),
    ("xml", "text/xml; charset=utf-8"),
    // Other
    ("pdf", "application/pdf"),
    ("wasm", "application/wasm"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
];

/// Content-Type for a file extension, `None` when unknown
///
/// # Examples
/// ```
/// use imgdrop::http::mime::content_type_for_extension;
/// assert_eq!(content_type_for_extension(Some("PNG")), Some("image/png"));
/// assert_eq!(content_type_for_extension(Some("xyz")), None);
/// ```
pub fn content_type_for_extension(extension: Option<&str>) -> Option<&'static str> {
    let extension = extension?;
    EXTENSION_TYPES
        .iter()
        .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
        .map(|(_, content_type)| *content_type)
}
