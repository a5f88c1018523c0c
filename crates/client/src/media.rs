//! Content-type inference for upload parts.

use std::path::Path;

/// Fallback for extensions with no known content type.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Returns the MIME type for a file based on its extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("jpg" | "jpeg" | "jpe") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("tif" | "tiff") => "image/tiff",
        Some("heic") => "image/heic",
        Some("heif") => "image/heif",
        Some("avif") => "image/avif",
        Some("jxl") => "image/jxl",
        Some("svg") => "image/svg+xml",
        Some("dng") => "image/x-adobe-dng",
        Some("cr2") => "image/x-canon-cr2",
        Some("cr3") => "image/x-canon-cr3",
        Some("nef") => "image/x-nikon-nef",
        Some("arw") => "image/x-sony-arw",
        Some("orf") => "image/x-olympus-orf",
        Some("raf") => "image/x-fuji-raf",
        Some("rw2") => "image/x-panasonic-rw2",
        Some("mp4" | "m4v") => "video/mp4",
        Some("mov" | "qt") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("3gp") => "video/3gpp",
        Some("mts" | "m2ts") => "video/mp2t",
        Some("mpg" | "mpeg") => "video/mpeg",
        Some("wmv") => "video/x-ms-wmv",
        Some("flv") => "video/x-flv",
        Some("xmp") => "application/rdf+xml",
        Some("json") => "application/json",
        _ => OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_types() {
        assert_eq!(content_type_for(Path::new("a/IMG_1.jpg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("clip.MOV")), "video/quicktime");
        assert_eq!(content_type_for(Path::new("IMG_1.xmp")), "application/rdf+xml");
        assert_eq!(content_type_for(Path::new("IMG_1.jpg.json")), "application/json");
    }

    #[test]
    fn unknown_falls_back() {
        assert_eq!(content_type_for(Path::new("notes.txt")), OCTET_STREAM);
        assert_eq!(content_type_for(Path::new("noext")), OCTET_STREAM);
    }
}
