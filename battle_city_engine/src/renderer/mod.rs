/// Renderer module - all rendering-related types and traits

pub mod renderer;
pub mod renderer_texture;
pub mod renderer_shader;
pub mod renderer_frame;

#[cfg(test)]
pub(crate) mod mock_renderer;

pub use renderer::*;
pub use renderer_texture::*;
pub use renderer_shader::*;
pub use renderer_frame::*;
