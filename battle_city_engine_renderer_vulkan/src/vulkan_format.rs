/// Conversions from engine types to Vulkan enums
///
/// Pure functions with no device access, unit-tested without a GPU.

use ash::vk;
use battle_city_engine::battle_city::render::{
    FilterMode, TextureFormat, UniformKind, WrapMode,
};

/// Stages that can read the push-constant uniform block
pub const UNIFORM_STAGES: vk::ShaderStageFlags = vk::ShaderStageFlags::from_raw(
    vk::ShaderStageFlags::VERTEX.as_raw() | vk::ShaderStageFlags::FRAGMENT.as_raw(),
);

pub fn texture_format_to_vk(format: TextureFormat) -> vk::Format {
    match format {
        TextureFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
    }
}

pub fn filter_to_vk(filter: FilterMode) -> vk::Filter {
    match filter {
        FilterMode::Nearest => vk::Filter::NEAREST,
        FilterMode::Linear => vk::Filter::LINEAR,
    }
}

/// Mip selection follows the texel filter
pub fn mipmap_mode_to_vk(filter: FilterMode) -> vk::SamplerMipmapMode {
    match filter {
        FilterMode::Nearest => vk::SamplerMipmapMode::NEAREST,
        FilterMode::Linear => vk::SamplerMipmapMode::LINEAR,
    }
}

pub fn wrap_to_vk(wrap: WrapMode) -> vk::SamplerAddressMode {
    match wrap {
        WrapMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        WrapMode::Repeat => vk::SamplerAddressMode::REPEAT,
        WrapMode::MirroredRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
    }
}

/// Prefer an sRGB BGRA/RGBA surface format, else take the first one offered
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|f| {
            (f.format == vk::Format::B8G8R8A8_SRGB || f.format == vk::Format::R8G8B8A8_SRGB)
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| formats.first())
        .copied()
}

pub fn is_srgb_format(format: vk::Format) -> bool {
    matches!(
        format,
        vk::Format::B8G8R8A8_SRGB | vk::Format::R8G8B8A8_SRGB | vk::Format::A8B8G8R8_SRGB_PACK32
    )
}

/// sRGB transfer function inverse for one channel in [0, 1]
pub fn srgb_to_linear(value: f32) -> f32 {
    if value <= 0.04045 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

/// Clear value that shows `color` on screen for the given attachment format.
/// sRGB attachments encode on write, so the color channels are linearized first.
pub fn clear_color_for_format(color: [f32; 4], format: vk::Format) -> [f32; 4] {
    if !is_srgb_format(format) {
        return color;
    }
    [
        srgb_to_linear(color[0]),
        srgb_to_linear(color[1]),
        srgb_to_linear(color[2]),
        color[3],
    ]
}

/// Clamp the window size into the surface limits unless the surface dictates it
pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// One image more than the minimum, capped by the maximum (0 means unbounded)
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// Viewport flipped vertically so +Y points up, matching the orthographic projection
pub fn flipped_viewport(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport::default()
        .x(0.0)
        .y(extent.height as f32)
        .width(extent.width as f32)
        .height(-(extent.height as f32))
        .min_depth(0.0)
        .max_depth(1.0)
}

/// Map a reflected push-constant member to a uniform kind.
///
/// Returns `None` for types the uniform setters cannot write (doubles,
/// arrays, nested structs, non-square matrices).
pub fn spirq_type_to_uniform_kind(ty: &spirq::ty::Type) -> Option<UniformKind> {
    use spirq::ty::{ScalarType, Type};

    fn is_f32(scalar: &ScalarType) -> bool {
        matches!(scalar, ScalarType::Float { bits: 32 })
    }

    match ty {
        Type::Scalar(ScalarType::Float { bits: 32 }) => Some(UniformKind::Float),
        Type::Scalar(ScalarType::Integer { bits: 32, .. }) => Some(UniformKind::Int),
        Type::Scalar(ScalarType::Boolean) => Some(UniformKind::Int),
        Type::Vector(v) if is_f32(&v.scalar_ty) => match v.nscalar {
            2 => Some(UniformKind::Vec2),
            3 => Some(UniformKind::Vec3),
            4 => Some(UniformKind::Vec4),
            _ => None,
        },
        Type::Matrix(m) if is_f32(&m.vector_ty.scalar_ty) && m.nvector == 4 && m.vector_ty.nscalar == 4 => {
            Some(UniformKind::Mat4)
        }
        _ => None,
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
