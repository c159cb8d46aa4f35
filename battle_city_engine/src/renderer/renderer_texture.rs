/// Texture trait, texture descriptor, and texture info

/// Texel format of a GPU texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    /// Color data, decoded to linear when sampled
    #[default]
    R8G8B8A8_SRGB,
    /// Raw values, sampled as stored
    R8G8B8A8_UNORM,
}

impl TextureFormat {
    /// Bytes per texel
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R8G8B8A8_SRGB | TextureFormat::R8G8B8A8_UNORM => 4,
        }
    }
}

/// Sampling filter for magnification and minification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Nearest texel, keeps pixel art crisp
    #[default]
    Nearest,
    Linear,
}

/// Addressing mode for texture coordinates outside [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirroredRepeat,
}

/// Mipmap chain configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MipmapMode {
    /// Only the base level
    None,
    /// Full chain generated on the GPU from the base level
    #[default]
    Generate,
}

impl MipmapMode {
    /// Number of mip levels for a texture of the given size
    pub fn mip_levels(&self, width: u32, height: u32) -> u32 {
        match self {
            MipmapMode::None => 1,
            MipmapMode::Generate => 32 - width.max(height).max(1).leading_zeros(),
        }
    }
}

// ===== TEXTURE DESC =====

/// Descriptor for creating a texture
#[derive(Debug, Clone)]
pub struct TextureDesc {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    pub format: TextureFormat,
    /// Tightly packed texels, rows bottom to top
    pub data: Vec<u8>,
    pub filter: FilterMode,
    pub wrap: WrapMode,
    pub mipmap: MipmapMode,
}

impl TextureDesc {
    /// Byte size the texel data must have
    pub fn expected_data_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel() as usize
    }
}

// ===== TEXTURE INFO =====

/// Read-only properties of a created texture.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    pub format: TextureFormat,
    /// Number of mip levels allocated
    pub mip_levels: u32,
}

// ===== TEXTURE TRAIT =====

/// Texture resource trait
///
/// Implemented by backend-specific texture types. The GPU texture is
/// released when the last reference is dropped.
pub trait RendererTexture: Send + Sync {
    /// Get the read-only properties of this texture
    fn info(&self) -> &TextureInfo;
}

#[cfg(test)]
#[path = "renderer_texture_tests.rs"]
mod tests;
