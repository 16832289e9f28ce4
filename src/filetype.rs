//! Content type detection for served artifacts.
//!
//! Classification runs in four phases:
//! 1. Image extension lookup (fast path for known image types)
//! 2. Image magic byte detection (for extensionless artifacts)
//! 3. NUL byte heuristic (git's binary detection approach)
//! 4. UTF-8 validation (text vs binary)

use std::path::Path;

/// Maximum bytes to check for NUL byte heuristic.
const BINARY_CHECK_LEN: usize = 8192;

/// Content classification of a stored artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Image the browser can render inline
    Image(ImageFormat),
    /// UTF-8 text
    Text,
    /// Anything else
    Binary,
}

impl ContentKind {
    /// MIME type sent with inline artifact bytes.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Image(format) => format.mime_type(),
            Self::Text => "text/plain; charset=utf-8",
            Self::Binary => "application/octet-stream",
        }
    }
}

/// Image formats recognized for inline display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Svg,
    Webp,
    Bmp,
}

impl ImageFormat {
    /// MIME type for HTTP responses
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Svg => "image/svg+xml",
            Self::Webp => "image/webp",
            Self::Bmp => "image/bmp",
        }
    }
}

/// Classifies artifact content from its path and bytes.
///
/// # Examples
///
/// ```
/// use diskref::{ContentKind, ImageFormat, detect_content_kind};
/// use std::path::Path;
///
/// let png_header = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
/// assert_eq!(
///     detect_content_kind(&png_header, Path::new("chart")),
///     ContentKind::Image(ImageFormat::Png)
/// );
/// assert_eq!(
///     detect_content_kind(b"a,b\n1,2\n", Path::new("data.csv")),
///     ContentKind::Text
/// );
/// ```
pub fn detect_content_kind(bytes: &[u8], path: &Path) -> ContentKind {
    if let Some(format) = image_by_extension(path) {
        return ContentKind::Image(format);
    }

    if let Some(format) = image_by_magic(bytes) {
        return ContentKind::Image(format);
    }

    let check_len = bytes.len().min(BINARY_CHECK_LEN);
    if bytes[..check_len].contains(&0) {
        return ContentKind::Binary;
    }

    if std::str::from_utf8(bytes).is_ok() {
        ContentKind::Text
    } else {
        ContentKind::Binary
    }
}

fn image_by_extension(path: &Path) -> Option<ImageFormat> {
    let ext = path.extension()?.to_str()?.to_lowercase();

    match ext.as_str() {
        "png" => Some(ImageFormat::Png),
        "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
        "gif" => Some(ImageFormat::Gif),
        "svg" => Some(ImageFormat::Svg),
        "webp" => Some(ImageFormat::Webp),
        "bmp" => Some(ImageFormat::Bmp),
        _ => None,
    }
}

fn image_by_magic(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some(ImageFormat::Png);
    }

    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(ImageFormat::Jpeg);
    }

    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some(ImageFormat::Gif);
    }

    if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        return Some(ImageFormat::Webp);
    }

    if bytes.len() >= 6
        && bytes.starts_with(b"BM")
        && u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]) >= 54
    {
        return Some(ImageFormat::Bmp);
    }

    if is_svg_root_element(bytes) {
        return Some(ImageFormat::Svg);
    }

    None
}

/// Checks whether `<svg` is the root element, after optional XML declaration.
fn is_svg_root_element(bytes: &[u8]) -> bool {
    let check_len = bytes.len().min(1024);
    let Ok(text) = std::str::from_utf8(&bytes[..check_len]) else {
        return false;
    };

    let mut content = text.trim_start();

    if let Some(rest) = content.strip_prefix("<?xml") {
        let Some(end) = rest.find("?>") else {
            return false;
        };
        content = rest[end + 2..].trim_start();
    }

    content.starts_with("<svg")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_by_extension() {
        assert_eq!(
            detect_content_kind(b"not really png", Path::new("artifacts/chart.png")),
            ContentKind::Image(ImageFormat::Png)
        );
    }

    #[test]
    fn test_extension_case_insensitive() {
        assert_eq!(
            detect_content_kind(b"", Path::new("PHOTO.JPEG")),
            ContentKind::Image(ImageFormat::Jpeg)
        );
    }

    #[test]
    fn test_jpeg_by_magic_bytes() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        assert_eq!(
            detect_content_kind(&jpeg, Path::new("plot")),
            ContentKind::Image(ImageFormat::Jpeg)
        );
    }

    #[test]
    fn test_gif_and_webp_by_magic_bytes() {
        assert_eq!(
            detect_content_kind(b"GIF89a\x00\x00", Path::new("anim")),
            ContentKind::Image(ImageFormat::Gif)
        );
        assert_eq!(
            detect_content_kind(b"RIFF\x00\x00\x00\x00WEBPVP8 ", Path::new("img")),
            ContentKind::Image(ImageFormat::Webp)
        );
    }

    #[test]
    fn test_riff_without_webp_is_binary() {
        assert_eq!(
            detect_content_kind(b"RIFF\x00\x00\x00\x00WAVEfmt ", Path::new("sound")),
            ContentKind::Binary
        );
    }

    #[test]
    fn test_bmp_requires_plausible_size() {
        let valid = [b'B', b'M', 0x36, 0x00, 0x00, 0x00];
        let tiny = [b'B', b'M', 0x01, 0x00, 0x00, 0x00];
        assert_eq!(
            detect_content_kind(&valid, Path::new("x")),
            ContentKind::Image(ImageFormat::Bmp)
        );
        assert_eq!(detect_content_kind(&tiny, Path::new("x")), ContentKind::Binary);
    }

    #[test]
    fn test_svg_with_xml_declaration() {
        // Arrange
        let svg = b"<?xml version=\"1.0\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\"/>";

        // Act
        let kind = detect_content_kind(svg, Path::new("figure"));

        // Assert
        assert_eq!(kind, ContentKind::Image(ImageFormat::Svg));
        assert_eq!(kind.mime_type(), "image/svg+xml");
    }

    #[test]
    fn test_svg_incomplete_declaration_is_text() {
        assert_eq!(
            detect_content_kind(b"<?xml version=\"1.0\" <svg>", Path::new("x")),
            ContentKind::Text
        );
    }

    #[test]
    fn test_html_mentioning_svg_is_text() {
        assert_eq!(
            detect_content_kind(b"<html><svg></svg></html>", Path::new("page")),
            ContentKind::Text
        );
    }

    #[test]
    fn test_text_and_binary() {
        assert_eq!(
            detect_content_kind(b"a,b\n1,2\n", Path::new("data.csv")),
            ContentKind::Text
        );
        assert_eq!(
            detect_content_kind(b"abc\x00def", Path::new("blob.bin")),
            ContentKind::Binary
        );
        assert_eq!(
            detect_content_kind(&[0xC3, 0x28], Path::new("bad")),
            ContentKind::Binary
        );
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(ContentKind::Text.mime_type(), "text/plain; charset=utf-8");
        assert_eq!(ContentKind::Binary.mime_type(), "application/octet-stream");
        assert_eq!(
            ContentKind::Image(ImageFormat::Webp).mime_type(),
            "image/webp"
        );
    }
}
