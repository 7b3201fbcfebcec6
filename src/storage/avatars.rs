use std::path::Path;

use crate::error::{AppError, AppResult};

pub const DEFAULT_AVATAR_URL: &str = "/static/default-avatar.png";

/// Image formats accepted for avatars, detected from content bytes. The
/// declared filename and extension are ignored entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
}

impl ImageFormat {
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageFormat::Gif)
        } else {
            None
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
        }
    }
}

/// Store avatar bytes under the uploads directory and return the public URL
/// they will be served from.
pub fn save(uploads_dir: &Path, bytes: &[u8]) -> AppResult<String> {
    let format = ImageFormat::sniff(bytes).ok_or_else(|| {
        AppError::Validation("Unsupported image format (use JPG, PNG, or GIF)".into())
    })?;

    std::fs::create_dir_all(uploads_dir)
        .map_err(|e| AppError::Internal(format!("create uploads dir: {}", e)))?;

    let filename = format!("avatar_{}.{}", uuid::Uuid::now_v7(), format.extension());
    let path = uploads_dir.join(&filename);
    std::fs::write(&path, bytes).map_err(|e| AppError::Internal(format!("write avatar: {}", e)))?;

    Ok(format!("/uploads/{}", filename))
}
