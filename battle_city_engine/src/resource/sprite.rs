/// Textured quad placed in screen space.
///
/// A sprite does not own its texture or shader program. It stores the
/// ResourceManager keys of both, so replacing a texture or program under
/// the same name is picked up on the next render.

use glam::{Mat4, Vec2};
use crate::error::Result;
use crate::renderer::RendererFrame;
use crate::resource::{ShaderProgram, ShaderProgramKey, Texture2D, TextureKey};

/// Name of the model matrix uniform in sprite shaders
pub const MODEL_MATRIX_UNIFORM: &str = "modelMat";

/// Texture unit the sprite texture is bound to
pub const SPRITE_TEXTURE_UNIT: u32 = 0;

/// Two triangles covering the unit quad
pub const QUAD_VERTEX_COUNT: u32 = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    texture: TextureKey,
    shader_program: ShaderProgramKey,
    position: Vec2,
    size: Vec2,
}

impl Sprite {
    /// Create a sprite at the origin
    pub fn new(texture: TextureKey, shader_program: ShaderProgramKey, size: Vec2) -> Self {
        Self {
            texture,
            shader_program,
            position: Vec2::ZERO,
            size,
        }
    }

    /// Move the sprite's bottom-left corner. Takes effect on the next render.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_size(&mut self, size: Vec2) {
        self.size = size;
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn texture_key(&self) -> TextureKey {
        self.texture
    }

    pub fn shader_program_key(&self) -> ShaderProgramKey {
        self.shader_program
    }

    /// translate(position) * scale(size), applied to the unit quad
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position.extend(0.0)) * Mat4::from_scale(self.size.extend(1.0))
    }

    /// Draw the sprite with already resolved resources
    ///
    /// Uploads the model matrix, binds the program, binds the texture to
    /// unit 0 and draws the quad.
    pub fn render(
        &self,
        shader_program: &mut ShaderProgram,
        texture: &Texture2D,
        frame: &dyn RendererFrame,
    ) -> Result<()> {
        shader_program.set_matrix4(MODEL_MATRIX_UNIFORM, self.model_matrix());
        shader_program.use_program(frame)?;
        texture.bind(frame, SPRITE_TEXTURE_UNIT)?;
        frame.draw(QUAD_VERTEX_COUNT, 0)
    }
}

#[cfg(test)]
#[path = "sprite_tests.rs"]
mod tests;
