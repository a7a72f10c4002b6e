use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::ImageFormat;

/// Largest room photo the workflow will upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DataUrl {
    pub fn file_extension(&self) -> &'static str {
        extension_for_mime(&self.mime)
    }
}

pub fn parse_data_url(value: &str) -> Result<DataUrl> {
    let (meta, payload) = value
        .trim()
        .split_once(',')
        .ok_or_else(|| anyhow!("invalid data URL image payload"))?;
    let meta = meta
        .strip_prefix("data:")
        .ok_or_else(|| anyhow!("data URL must start with 'data:'"))?;
    let Some(mime) = meta.strip_suffix(";base64") else {
        bail!("data URL must be base64 encoded");
    };
    let mime = if mime.trim().is_empty() {
        "image/png".to_string()
    } else {
        mime.trim().to_ascii_lowercase()
    };
    let bytes = BASE64
        .decode(payload.trim().as_bytes())
        .context("data URL base64 decode failed")?;
    Ok(DataUrl { mime, bytes })
}

pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", BASE64.encode(bytes))
}

/// MIME type from the file's magic bytes, `None` if it is not an image format
/// the gateway accepts.
pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes).ok()? {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Gif => Some("image/gif"),
        _ => None,
    }
}

pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}
