//! Magic-byte validation of generated media.

use crate::error::{ClientError, ClientResult};

/// Smallest payload accepted as real media.
const MIN_MEDIA_BYTES: usize = 12;

/// Image container detected from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Webp,
}

/// Video container detected from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoFormat {
    Mp4,
    Webm,
}

pub fn detect_image(data: &[u8]) -> Option<ImageFormat> {
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(ImageFormat::Png)
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageFormat::Jpeg)
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some(ImageFormat::Webp)
    } else {
        None
    }
}

pub fn detect_video(data: &[u8]) -> Option<VideoFormat> {
    if data.len() >= 8 && &data[4..8] == b"ftyp" {
        Some(VideoFormat::Mp4)
    } else if data.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        Some(VideoFormat::Webm)
    } else {
        None
    }
}

/// Reject empty, truncated or non-image payloads.
pub fn validate_image(data: &[u8]) -> ClientResult<ImageFormat> {
    if data.len() < MIN_MEDIA_BYTES {
        return Err(ClientError::invalid_media(format!(
            "image payload too small ({} bytes)",
            data.len()
        )));
    }
    detect_image(data).ok_or_else(|| ClientError::invalid_media("payload is not a PNG, JPEG or WebP image"))
}

/// Reject empty, truncated or non-video payloads.
pub fn validate_video(data: &[u8]) -> ClientResult<VideoFormat> {
    if data.len() < MIN_MEDIA_BYTES {
        return Err(ClientError::invalid_media(format!(
            "video payload too small ({} bytes)",
            data.len()
        )));
    }
    detect_video(data).ok_or_else(|| ClientError::invalid_media("payload is not an MP4 or WebM video"))
}
