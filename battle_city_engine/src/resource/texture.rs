/// Resource-level 2D texture.
///
/// Decodes an image file, flips it so row 0 is the bottom of the image
/// (matching the bottom-left origin of the orthographic projection), expands
/// it to RGBA8 and uploads it through the renderer.

use std::path::Path;
use std::sync::Arc;
use crate::engine_debug;
use crate::error::{Error, Result};
use crate::renderer::{
    FilterMode, MipmapMode, Renderer, RendererFrame, RendererTexture, TextureDesc,
    TextureFormat, WrapMode,
};

/// Pixel format, sampling and mipmap configuration of a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextureParams {
    pub format: TextureFormat,
    pub filter: FilterMode,
    pub wrap: WrapMode,
    pub mipmaps: MipmapMode,
}

/// Pixels decoded from an image file
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Channel count of the source image (3 for RGB, 4 for RGBA, ...)
    pub channels: u8,
    /// RGBA8 texels, bottom row first
    pub pixels: Vec<u8>,
}

/// Decode an in-memory image file
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| Error::ImageDecodeFailed(e.to_string()))?;
    let channels = image.color().channel_count();
    let rgba = image.flipv().into_rgba8();
    Ok(DecodedImage {
        width: rgba.width(),
        height: rgba.height(),
        channels,
        pixels: rgba.into_raw(),
    })
}

pub struct Texture2D {
    texture: Arc<dyn RendererTexture>,
    channels: u8,
    params: TextureParams,
}

impl Texture2D {
    /// Load an image file and upload it
    ///
    /// # Errors
    ///
    /// - `Error::FileReadFailed` if the file cannot be read
    /// - `Error::ImageDecodeFailed` if its contents are not a supported image
    pub fn load(renderer: &mut dyn Renderer, path: &Path, params: TextureParams) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| Error::FileReadFailed(format!("{}: {}", path.display(), e)))?;
        let decoded = decode_image(&bytes)
            .map_err(|e| match e {
                Error::ImageDecodeFailed(msg) => Error::ImageDecodeFailed(format!("{}: {}", path.display(), msg)),
                other => other,
            })?;
        engine_debug!("battle_city::Texture2D", "Decoded {} ({}x{}, {} channels)",
            path.display(), decoded.width, decoded.height, decoded.channels);
        Self::from_rgba8(renderer, decoded.width, decoded.height, decoded.channels, decoded.pixels, params)
    }

    /// Upload already decoded RGBA8 pixels
    pub fn from_rgba8(
        renderer: &mut dyn Renderer,
        width: u32,
        height: u32,
        channels: u8,
        pixels: Vec<u8>,
        params: TextureParams,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidResource(format!("texture size {}x{} is empty", width, height)));
        }
        let desc = TextureDesc {
            width,
            height,
            format: params.format,
            data: pixels,
            filter: params.filter,
            wrap: params.wrap,
            mipmap: params.mipmaps,
        };
        if desc.data.len() != desc.expected_data_len() {
            return Err(Error::InvalidResource(format!(
                "texture data is {} bytes, expected {} for {}x{} RGBA8",
                desc.data.len(), desc.expected_data_len(), width, height
            )));
        }
        let texture = renderer.create_texture(desc)?;
        Ok(Self { texture, channels, params })
    }

    /// Bind this texture to texture unit `unit` of the active program
    pub fn bind(&self, frame: &dyn RendererFrame, unit: u32) -> Result<()> {
        frame.bind_texture(unit, &self.texture)
    }

    pub fn width(&self) -> u32 {
        self.texture.info().width
    }

    pub fn height(&self) -> u32 {
        self.texture.info().height
    }

    /// Channel count of the source image
    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn mip_levels(&self) -> u32 {
        self.texture.info().mip_levels
    }

    pub fn format(&self) -> TextureFormat {
        self.texture.info().format
    }

    pub fn params(&self) -> TextureParams {
        self.params
    }

    pub fn render_texture(&self) -> &Arc<dyn RendererTexture> {
        &self.texture
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
