/// Game configuration
///
/// Typed defaults for the window, the renderer and the startup assets.
/// There is no config file: the values below are the game.

use battle_city_engine::battle_city::platform::WindowConfig;
use battle_city_engine::battle_city::render::Config;
use battle_city_engine::glam::Vec2;

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub window: WindowConfig,
    pub renderer: Config,
    pub clear_color: [f32; 4],
    pub assets: AssetsConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            renderer: Config::default(),
            clear_color: [0.15, 0.15, 0.15, 1.0],
            assets: AssetsConfig::default(),
        }
    }
}

/// Names and paths of the resources loaded at startup.
/// Paths are relative to the executable's directory.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetsConfig {
    pub shader_name: String,
    pub vertex_shader_path: String,
    pub fragment_shader_path: String,
    pub texture_name: String,
    pub texture_path: String,
    pub sprite_name: String,
    pub sprite_size: (u32, u32),
    pub sprite_position: Vec2,
    /// Sampler uniform of the sprite shader
    pub sampler_uniform: String,
    pub projection_uniform: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            shader_name: "SpriteShader".to_string(),
            vertex_shader_path: "res/shaders/sprite.vert.spv".to_string(),
            fragment_shader_path: "res/shaders/sprite.frag.spv".to_string(),
            texture_name: "DefaultTexture".to_string(),
            texture_path: "res/textures/kirpichi.png".to_string(),
            sprite_name: "NewSprite".to_string(),
            sprite_size: (500, 500),
            sprite_position: Vec2::new(500.0, 300.0),
            sampler_uniform: "tex".to_string(),
            projection_uniform: "projectionMat".to_string(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
