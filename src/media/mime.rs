//! Image content-type checks and extension inference.

/// Known image extensions, each with the MIME essences that map to it.
const IMAGE_TYPES: &[(&str, &[&str])] = &[
    ("jpg", &["image/jpeg", "image/jpg", "image/pjpeg"]),
    ("png", &["image/png"]),
    ("webp", &["image/webp"]),
    ("gif", &["image/gif"]),
    ("avif", &["image/avif"]),
    ("bmp", &["image/bmp"]),
    ("svg", &["image/svg+xml"]),
    ("tiff", &["image/tiff"]),
];

pub const DEFAULT_EXTENSION: &str = "jpg";

/// Lowercased `type/subtype` with parameters stripped.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Whether a `Content-Type` value denotes an image media type.
pub fn is_image_content_type(content_type: &str) -> bool {
    essence(content_type)
        .strip_prefix("image/")
        .is_some_and(|subtype| !subtype.is_empty())
}

pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let essence = essence(content_type);
    IMAGE_TYPES
        .iter()
        .find(|(_, types)| types.contains(&essence.as_str()))
        .map(|(ext, _)| *ext)
}

/// Image extension embedded in a URL path, ignoring query and fragment.
pub fn extension_from_url(url: &str) -> Option<&'static str> {
    let path = url.split('?').next().unwrap_or(url);
    let path = path.split('#').next().unwrap_or(path);
    let file_name = path.rsplit('/').next()?;
    let (_, ext) = file_name.rsplit_once('.')?;

    let ext = ext.to_ascii_lowercase();
    let ext = if ext == "jpeg" { "jpg".to_string() } else { ext };

    IMAGE_TYPES
        .iter()
        .map(|(known, _)| *known)
        .find(|known| *known == ext)
}

/// Declared content type, then URL path, then `jpg`.
pub fn infer_extension(content_type: Option<&str>, url: &str) -> &'static str {
    content_type
        .and_then(extension_for_content_type)
        .or_else(|| extension_from_url(url))
        .unwrap_or(DEFAULT_EXTENSION)
}
