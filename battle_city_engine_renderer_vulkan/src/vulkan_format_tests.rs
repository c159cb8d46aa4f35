//! Unit tests for the Vulkan conversion functions
//!
//! Pure mappings, no GPU required.

use super::*;
use spirq::ty::{ScalarType, Type, VectorType};

// ============================================================================
// TEXTURE / SAMPLER CONVERSIONS
// ============================================================================

#[test]
fn test_texture_format_to_vk() {
    assert_eq!(texture_format_to_vk(TextureFormat::R8G8B8A8_SRGB), vk::Format::R8G8B8A8_SRGB);
    assert_eq!(texture_format_to_vk(TextureFormat::R8G8B8A8_UNORM), vk::Format::R8G8B8A8_UNORM);
}

#[test]
fn test_filter_and_mipmap_mode_follow_filter() {
    assert_eq!(filter_to_vk(FilterMode::Nearest), vk::Filter::NEAREST);
    assert_eq!(filter_to_vk(FilterMode::Linear), vk::Filter::LINEAR);
    assert_eq!(mipmap_mode_to_vk(FilterMode::Nearest), vk::SamplerMipmapMode::NEAREST);
    assert_eq!(mipmap_mode_to_vk(FilterMode::Linear), vk::SamplerMipmapMode::LINEAR);
}

#[test]
fn test_wrap_to_vk() {
    assert_eq!(wrap_to_vk(WrapMode::ClampToEdge), vk::SamplerAddressMode::CLAMP_TO_EDGE);
    assert_eq!(wrap_to_vk(WrapMode::Repeat), vk::SamplerAddressMode::REPEAT);
    assert_eq!(wrap_to_vk(WrapMode::MirroredRepeat), vk::SamplerAddressMode::MIRRORED_REPEAT);
}

#[test]
fn test_uniform_stages_cover_vertex_and_fragment() {
    assert!(UNIFORM_STAGES.contains(vk::ShaderStageFlags::VERTEX));
    assert!(UNIFORM_STAGES.contains(vk::ShaderStageFlags::FRAGMENT));
    assert!(!UNIFORM_STAGES.contains(vk::ShaderStageFlags::COMPUTE));
}

// ============================================================================
// SWAPCHAIN HELPERS
// ============================================================================

fn surface_format(format: vk::Format) -> vk::SurfaceFormatKHR {
    vk::SurfaceFormatKHR {
        format,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    }
}

#[test]
fn test_choose_surface_format_prefers_srgb() {
    let formats = [
        surface_format(vk::Format::B8G8R8A8_UNORM),
        surface_format(vk::Format::B8G8R8A8_SRGB),
    ];
    assert_eq!(choose_surface_format(&formats).unwrap().format, vk::Format::B8G8R8A8_SRGB);
}

#[test]
fn test_choose_surface_format_falls_back_to_first() {
    let formats = [surface_format(vk::Format::A2B10G10R10_UNORM_PACK32)];
    assert_eq!(
        choose_surface_format(&formats).unwrap().format,
        vk::Format::A2B10G10R10_UNORM_PACK32
    );
    assert!(choose_surface_format(&[]).is_none());
}

#[test]
fn test_is_srgb_format() {
    assert!(is_srgb_format(vk::Format::B8G8R8A8_SRGB));
    assert!(is_srgb_format(vk::Format::R8G8B8A8_SRGB));
    assert!(!is_srgb_format(vk::Format::B8G8R8A8_UNORM));
}

#[test]
fn test_srgb_to_linear_endpoints_and_midtone() {
    assert_eq!(srgb_to_linear(0.0), 0.0);
    assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
    // Linear segment
    assert!((srgb_to_linear(0.04) - 0.04 / 12.92).abs() < 1e-7);
    assert!((srgb_to_linear(0.5) - 0.214_041).abs() < 1e-4);
}

#[test]
fn test_clear_color_linearized_for_srgb_attachment() {
    let grey = [0.15, 0.15, 0.15, 1.0];
    let cleared = clear_color_for_format(grey, vk::Format::B8G8R8A8_SRGB);

    // 0.15 on screen is about 0.0196 in linear space
    for channel in &cleared[..3] {
        assert!((channel - 0.019_607).abs() < 1e-4, "got {}", channel);
    }
    assert_eq!(cleared[3], 1.0);
}

#[test]
fn test_clear_color_unchanged_for_unorm_attachment() {
    let grey = [0.15, 0.15, 0.15, 1.0];
    assert_eq!(clear_color_for_format(grey, vk::Format::B8G8R8A8_UNORM), grey);
}

#[test]
fn test_choose_extent_uses_current_extent_when_fixed() {
    let capabilities = vk::SurfaceCapabilitiesKHR {
        current_extent: vk::Extent2D { width: 1920, height: 1080 },
        ..Default::default()
    };
    assert_eq!(choose_extent(&capabilities, 640, 480), vk::Extent2D { width: 1920, height: 1080 });
}

#[test]
fn test_choose_extent_clamps_window_size() {
    let capabilities = vk::SurfaceCapabilitiesKHR {
        current_extent: vk::Extent2D { width: u32::MAX, height: u32::MAX },
        min_image_extent: vk::Extent2D { width: 1, height: 1 },
        max_image_extent: vk::Extent2D { width: 1024, height: 768 },
        ..Default::default()
    };
    assert_eq!(choose_extent(&capabilities, 640, 480), vk::Extent2D { width: 640, height: 480 });
    assert_eq!(choose_extent(&capabilities, 4000, 4000), vk::Extent2D { width: 1024, height: 768 });
}

#[test]
fn test_choose_image_count() {
    let mut capabilities = vk::SurfaceCapabilitiesKHR {
        min_image_count: 2,
        max_image_count: 0,
        ..Default::default()
    };
    assert_eq!(choose_image_count(&capabilities), 3);

    capabilities.max_image_count = 2;
    assert_eq!(choose_image_count(&capabilities), 2);
}

#[test]
fn test_flipped_viewport_points_y_up() {
    let viewport = flipped_viewport(vk::Extent2D { width: 640, height: 480 });
    assert_eq!(viewport.y, 480.0);
    assert_eq!(viewport.height, -480.0);
    assert_eq!(viewport.width, 640.0);
}

// ============================================================================
// UNIFORM REFLECTION TYPES
// ============================================================================

#[test]
fn test_scalar_uniform_kinds() {
    assert_eq!(
        spirq_type_to_uniform_kind(&Type::Scalar(ScalarType::Float { bits: 32 })),
        Some(UniformKind::Float)
    );
    assert_eq!(
        spirq_type_to_uniform_kind(&Type::Scalar(ScalarType::Integer { bits: 32, is_signed: true })),
        Some(UniformKind::Int)
    );
    assert_eq!(
        spirq_type_to_uniform_kind(&Type::Scalar(ScalarType::Float { bits: 64 })),
        None
    );
}

#[test]
fn test_vector_uniform_kinds() {
    let vector = |nscalar| Type::Vector(VectorType {
        scalar_ty: ScalarType::Float { bits: 32 },
        nscalar,
    });
    assert_eq!(spirq_type_to_uniform_kind(&vector(2)), Some(UniformKind::Vec2));
    assert_eq!(spirq_type_to_uniform_kind(&vector(3)), Some(UniformKind::Vec3));
    assert_eq!(spirq_type_to_uniform_kind(&vector(4)), Some(UniformKind::Vec4));

    let int_vector = Type::Vector(VectorType {
        scalar_ty: ScalarType::Integer { bits: 32, is_signed: true },
        nscalar: 2,
    });
    assert_eq!(spirq_type_to_uniform_kind(&int_vector), None);
}
