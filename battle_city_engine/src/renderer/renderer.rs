/// Renderer trait and configuration
///
/// The renderer is the factory for GPU resources and the owner of the frame
/// loop (acquire, record, present). Backends implement it; the rest of the
/// engine only talks to `dyn Renderer`.

use std::sync::Arc;
use crate::error::Result;
use crate::renderer::{
    RendererTexture, TextureDesc,
    RendererShaderProgram, ShaderProgramDesc,
    RendererFrame,
};

/// Number of texture units a shader program can sample from
pub const MAX_TEXTURE_UNITS: u32 = 4;

/// Renderer configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Enable validation layers (debug builds only by default)
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Required graphics API version (major, minor)
    pub api_version: (u32, u32),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Battle City".to_string(),
            app_version: (0, 1, 0),
            api_version: (1, 3),
        }
    }
}

/// Statistics of the last presented frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RendererStats {
    /// Draw calls recorded in the last frame
    pub draw_calls: u32,
    /// Triangles submitted in the last frame
    pub triangles: u32,
    /// Bytes of GPU memory held by live textures
    pub gpu_memory_used: u64,
}

/// Main renderer trait
///
/// Implemented by backend-specific renderers (e.g., VulkanRenderer).
pub trait Renderer: Send + Sync {
    /// Create a texture and upload its initial pixels
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn RendererTexture>>;

    /// Compile both stages of `desc` and link them into a program
    ///
    /// # Errors
    ///
    /// `Error::ShaderCompilationFailed` with the backend message when a stage
    /// is rejected or the program cannot be linked.
    fn create_shader_program(&mut self, desc: ShaderProgramDesc) -> Result<Arc<dyn RendererShaderProgram>>;

    /// Color the framebuffer is cleared to at the start of each frame
    fn set_clear_color(&mut self, color: [f32; 4]);

    /// Begin a new frame
    ///
    /// Returns `None` when the frame must be skipped (minimized window,
    /// swapchain recreated after a resize).
    fn begin_frame(&mut self) -> Result<Option<Arc<dyn RendererFrame>>>;

    /// Submit the recorded frame and present it
    fn end_frame(&mut self, frame: Arc<dyn RendererFrame>) -> Result<()>;

    /// Wait for all GPU operations to complete
    fn wait_idle(&self) -> Result<()>;

    fn stats(&self) -> RendererStats;

    /// Notify the renderer that the framebuffer size changed
    fn resize(&mut self, width: u32, height: u32);
}
