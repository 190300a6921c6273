//! Texture decoding and the process-wide default texture.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use tracing::warn;

use keel_scene::EmbeddedTexture;

use crate::error::AssetError;

/// Pixel format of a decoded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8,
}

/// A decoded texture with raw pixel data.
#[derive(Debug, Clone)]
pub struct TextureAsset {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub format: TextureFormat,
}

/// Decode the image file at `path` into RGBA8.
pub fn load_texture(path: &Path) -> Result<TextureAsset, AssetError> {
    let img = image::open(path)
        .map_err(|e| AssetError::ImageDecodeFailed(path.to_path_buf(), e.to_string()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(TextureAsset {
        width,
        height,
        data: rgba.into_raw(),
        format: TextureFormat::Rgba8,
    })
}

/// Decode an embedded texture without touching the filesystem.
///
/// A zero height marks `data` as a compressed blob (PNG, JPEG); otherwise
/// `data` must hold exactly `width * height` raw RGBA8 pixels.
pub fn decode_embedded(index: usize, texture: &EmbeddedTexture) -> Result<TextureAsset, AssetError> {
    if texture.height == 0 {
        let img = image::load_from_memory(&texture.data)
            .map_err(|e| AssetError::EmbeddedDecodeFailed(index, e.to_string()))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        return Ok(TextureAsset {
            width,
            height,
            data: rgba.into_raw(),
            format: TextureFormat::Rgba8,
        });
    }

    // Checked so absurd dimensions from a hostile source read as a decode
    // failure, not an arithmetic overflow.
    let expected = (texture.width as usize)
        .checked_mul(texture.height as usize)
        .and_then(|pixels| pixels.checked_mul(4));
    if expected != Some(texture.data.len()) {
        return Err(AssetError::EmbeddedDecodeFailed(
            index,
            format!(
                "raw pixel buffer is {} bytes for {}x{}",
                texture.data.len(),
                texture.width,
                texture.height
            ),
        ));
    }

    Ok(TextureAsset {
        width: texture.width,
        height: texture.height,
        data: texture.data.clone(),
        format: TextureFormat::Rgba8,
    })
}

static DEFAULT_TEXTURE: OnceLock<Arc<TextureAsset>> = OnceLock::new();

/// The process-wide default texture, substituted for anything unresolvable.
///
/// Loaded from `path` on first use; the first caller's path wins and later
/// calls reuse the initialized asset. Falls back to a generated checkerboard
/// when the file itself is absent.
pub fn default_texture(path: &Path) -> Arc<TextureAsset> {
    DEFAULT_TEXTURE
        .get_or_init(|| match load_texture(path) {
            Ok(texture) => Arc::new(texture),
            Err(e) => {
                warn!("Default texture unavailable, using placeholder: {}", e);
                Arc::new(placeholder_texture(16))
            }
        })
        .clone()
}

/// Grey-and-white checkerboard stand-in for the default texture.
fn placeholder_texture(size: u32) -> TextureAsset {
    let mut data = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            if ((x / 4) + (y / 4)) % 2 == 0 {
                data.extend_from_slice(&[255, 255, 255, 255]);
            } else {
                data.extend_from_slice(&[128, 128, 128, 255]);
            }
        }
    }
    TextureAsset {
        width: size,
        height: size,
        data,
        format: TextureFormat::Rgba8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn missing_file_fails_to_load() {
        assert!(load_texture(Path::new("/nonexistent/missing.png")).is_err());
    }

    #[test]
    fn raw_embedded_pixels_pass_through() {
        let embedded = EmbeddedTexture {
            width: 2,
            height: 2,
            data: vec![7; 16],
        };
        let texture = decode_embedded(0, &embedded).unwrap();
        assert_eq!((texture.width, texture.height), (2, 2));
        assert_eq!(texture.data, vec![7; 16]);
    }

    #[test]
    fn raw_embedded_size_mismatch_is_rejected() {
        let embedded = EmbeddedTexture {
            width: 2,
            height: 2,
            data: vec![7; 10],
        };
        assert!(matches!(
            decode_embedded(3, &embedded),
            Err(AssetError::EmbeddedDecodeFailed(3, _))
        ));
    }

    #[test]
    fn oversized_raw_dimensions_are_rejected() {
        let embedded = EmbeddedTexture {
            width: u32::MAX,
            height: u32::MAX,
            data: vec![7; 4],
        };
        assert!(matches!(
            decode_embedded(5, &embedded),
            Err(AssetError::EmbeddedDecodeFailed(5, _))
        ));
    }

    #[test]
    fn compressed_embedded_blob_decodes() {
        let mut png = Vec::new();
        image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]))
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let embedded = EmbeddedTexture {
            width: 0,
            height: 0,
            data: png,
        };
        let texture = decode_embedded(0, &embedded).unwrap();
        assert_eq!((texture.width, texture.height), (3, 2));
        assert_eq!(&texture.data[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn garbage_embedded_blob_is_rejected() {
        let embedded = EmbeddedTexture {
            width: 0,
            height: 0,
            data: vec![1, 2, 3],
        };
        assert!(decode_embedded(0, &embedded).is_err());
    }

    #[test]
    fn default_texture_always_resolves() {
        let texture = default_texture(Path::new("/nonexistent/default.png"));
        assert!(texture.width > 0);
        assert!(texture.height > 0);
        assert_eq!(
            texture.data.len(),
            (texture.width * texture.height * 4) as usize
        );
    }
}
