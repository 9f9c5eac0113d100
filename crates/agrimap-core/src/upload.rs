//! Upload validation and filename sanitization for map images.
//!
//! Validation runs synchronously at submission; a violation rejects the
//! upload before any job is created.

use crate::defaults;
use crate::error::{Error, Result};

/// Validate a map-image upload.
///
/// Rules, checked in order:
/// 1. the file must be non-empty,
/// 2. the filename must end in an accepted image extension
///    (case-insensitive),
/// 3. the file must not exceed [`defaults::MAX_UPLOAD_BYTES`].
///
/// Each violation returns an [`Error::InvalidInput`] naming the rule.
pub fn validate_map_image(filename: &str, data: &[u8]) -> Result<()> {
    if data.is_empty() {
        return Err(Error::InvalidInput("Image file is empty".to_string()));
    }

    let extension_ok = match filename.rsplit_once('.') {
        Some((_, ext)) => {
            defaults::ALLOWED_IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        }
        None => false,
    };
    if !extension_ok {
        return Err(Error::InvalidInput(
            "Unsupported image format (JPG and PNG only)".to_string(),
        ));
    }

    if data.len() > defaults::MAX_UPLOAD_BYTES {
        return Err(Error::InvalidInput(format!(
            "Image exceeds maximum size of {} MB",
            defaults::MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }

    Ok(())
}

/// Sanitize an uploaded filename for filesystem storage.
///
/// Strips path components, drops non-ASCII characters (diacritics in
/// Vietnamese filenames break downstream path handling), and replaces
/// characters that are unsafe in paths. Falls back to `map_image` when
/// nothing survives.
pub fn sanitize_filename(filename: &str) -> String {
    // Remove path components
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let sanitized: String = name
        .chars()
        .filter(|c| c.is_ascii())
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '\0' | ' ' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let sanitized = sanitized.trim_matches(['_', '.']).to_string();
    if sanitized.is_empty() {
        return "map_image".to_string();
    }

    // Truncate if too long (preserve extension)
    if sanitized.len() > 255 {
        if let Some(dot_pos) = sanitized.rfind('.') {
            let ext = &sanitized[dot_pos..];
            let stem = &sanitized[..255 - ext.len()];
            return format!("{}{}", stem, ext);
        }
        return sanitized[..255].to_string();
    }

    sanitized
}
