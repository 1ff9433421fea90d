//! MIME type detection based on file extensions.

use std::path::Path;

pub const DEFAULT_MIME: &str = "application/octet-stream";

/// Content type for `path`, by extension (case-insensitive).
///
/// # Example
///
/// ```
/// # use rawhttp::http::mime::content_type_for;
/// assert_eq!(content_type_for("pages/index.HTML".as_ref()), "text/html");
/// assert_eq!(content_type_for("blob".as_ref()), "application/octet-stream");
/// ```
pub fn content_type_for(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| from_extension(&ext.to_ascii_lowercase()))
        .unwrap_or(DEFAULT_MIME)
}

fn from_extension(ext: &str) -> &'static str {
    match ext {
        // text
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain",
        "xml" => "application/xml",
        "csv" => "text/csv",

        // images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "bmp" => "image/bmp",

        // video
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "wmv" => "video/x-ms-wmv",

        // audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",

        // fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",

        // documents
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",

        // archives
        "zip" => "application/zip",
        "tar" => "application/x-tar",
        "gz" => "application/gzip",
        "rar" => "application/vnd.rar",
        "7z" => "application/x-7z-compressed",

        _ => DEFAULT_MIME,
    }
}
