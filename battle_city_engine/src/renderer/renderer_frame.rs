/// Frame recording trait

use std::sync::Arc;
use crate::error::Result;
use crate::renderer::{RendererShaderProgram, RendererTexture};

/// Commands recorded between `Renderer::begin_frame` and `Renderer::end_frame`
///
/// Texture and uniform commands apply to the most recently bound program.
pub trait RendererFrame: Send + Sync {
    /// Make `program` the active program for subsequent commands
    fn bind_shader_program(&self, program: &Arc<dyn RendererShaderProgram>) -> Result<()>;

    /// Bind `texture` to texture unit `unit` of the active program
    fn bind_texture(&self, unit: u32, texture: &Arc<dyn RendererTexture>) -> Result<()>;

    /// Upload the uniform block of the active program
    fn push_uniforms(&self, data: &[u8]) -> Result<()>;

    /// Draw `vertex_count` vertices starting at `first_vertex`
    fn draw(&self, vertex_count: u32, first_vertex: u32) -> Result<()>;
}
