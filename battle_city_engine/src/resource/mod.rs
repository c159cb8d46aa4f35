//! Resource management module
//!
//! Named shader programs, textures and sprites, owned by the ResourceManager.

mod resource_manager;
pub mod shader_program;
pub mod texture;
pub mod sprite;

pub use resource_manager::{ResourceManager, ShaderProgramKey, TextureKey, SpriteKey};
pub use shader_program::ShaderProgram;
pub use texture::{Texture2D, TextureParams, DecodedImage, decode_image};
pub use sprite::{Sprite, MODEL_MATRIX_UNIFORM, SPRITE_TEXTURE_UNIT, QUAD_VERTEX_COUNT};
