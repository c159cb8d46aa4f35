/// Central resource manager for the engine.
///
/// Owns every shader program, texture and sprite, each stored in a slot map
/// arena and reachable by name. Keys stay stable when a name is re-registered:
/// the new resource takes the old one's slot and the old GPU object is
/// released, so sprites referencing that key pick up the replacement.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use glam::Vec2;
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, Key, SlotMap};
use crate::error::{Error, Result};
use crate::renderer::{Renderer, RendererFrame};
use crate::resource::{ShaderProgram, Sprite, Texture2D, TextureParams};
use crate::{engine_debug, engine_error, engine_info};

new_key_type! {
    /// Stable handle to a shader program
    pub struct ShaderProgramKey;
    /// Stable handle to a texture
    pub struct TextureKey;
    /// Stable handle to a sprite
    pub struct SpriteKey;
}

pub struct ResourceManager {
    renderer: Arc<Mutex<dyn Renderer>>,
    /// Directory relative asset paths are resolved against
    asset_root: PathBuf,
    shader_programs: SlotMap<ShaderProgramKey, ShaderProgram>,
    textures: SlotMap<TextureKey, Texture2D>,
    sprites: SlotMap<SpriteKey, Sprite>,
    shader_program_names: FxHashMap<String, ShaderProgramKey>,
    texture_names: FxHashMap<String, TextureKey>,
    sprite_names: FxHashMap<String, SpriteKey>,
}

impl ResourceManager {
    /// Create an empty resource manager
    ///
    /// # Arguments
    ///
    /// * `renderer` - Renderer used to create GPU objects
    /// * `executable_path` - Path of the running executable. Relative asset
    ///   paths are resolved against its parent directory.
    pub fn new(renderer: Arc<Mutex<dyn Renderer>>, executable_path: &Path) -> Self {
        let asset_root = match executable_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        engine_debug!("battle_city::ResourceManager", "Asset root: {}", asset_root.display());

        Self {
            renderer,
            asset_root,
            shader_programs: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            sprites: SlotMap::with_key(),
            shader_program_names: FxHashMap::default(),
            texture_names: FxHashMap::default(),
            sprite_names: FxHashMap::default(),
        }
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    /// Absolute paths are kept, relative ones are joined to the asset root
    pub fn resolve_asset_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.asset_root.join(path)
        }
    }

    // ===== LOADING =====

    /// Read two SPIR-V files, build a program from them and store it under `name`
    ///
    /// # Errors
    ///
    /// - `Error::FileReadFailed` if either file cannot be read
    /// - `Error::ShaderCompilationFailed` with the backend message if the
    ///   program cannot be built
    ///
    /// The registry is left untouched on failure.
    pub fn load_shaders(
        &mut self,
        name: &str,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> Result<ShaderProgramKey> {
        let result = self.build_shader_program(vertex_path.as_ref(), fragment_path.as_ref());
        let program = match result {
            Ok(program) => program,
            Err(error) => {
                engine_error!("battle_city::ResourceManager",
                    "Failed to load shader program '{}': {}", name, error);
                return Err(error);
            }
        };

        let (key, replaced) = insert_named(&mut self.shader_programs, &mut self.shader_program_names, name, program);
        log_stored("shader program", name, replaced.is_some());
        Ok(key)
    }

    /// Load a texture with nearest filtering, clamp-to-edge wrapping and mipmaps
    pub fn load_texture(&mut self, name: &str, path: impl AsRef<Path>) -> Result<TextureKey> {
        self.load_texture_with_params(name, path, TextureParams::default())
    }

    /// Decode an image file, upload it and store it under `name`
    ///
    /// # Errors
    ///
    /// - `Error::FileReadFailed` if the file is missing
    /// - `Error::ImageDecodeFailed` if it cannot be decoded
    ///
    /// The registry is left untouched on failure.
    pub fn load_texture_with_params(
        &mut self,
        name: &str,
        path: impl AsRef<Path>,
        params: TextureParams,
    ) -> Result<TextureKey> {
        let full_path = self.resolve_asset_path(path);
        let result = {
            let mut renderer = lock_renderer(&self.renderer)?;
            Texture2D::load(&mut *renderer, &full_path, params)
        };
        let texture = match result {
            Ok(texture) => texture,
            Err(error) => {
                engine_error!("battle_city::ResourceManager",
                    "Failed to load texture '{}': {}", name, error);
                return Err(error);
            }
        };

        let (key, replaced) = insert_named(&mut self.textures, &mut self.texture_names, name, texture);
        log_stored("texture", name, replaced.is_some());
        Ok(key)
    }

    /// Create a sprite at the origin referencing a loaded texture and program
    ///
    /// # Errors
    ///
    /// `Error::ResourceNotFound` if either name is not registered. The sprite
    /// registry is left untouched.
    pub fn load_sprite(
        &mut self,
        name: &str,
        texture_name: &str,
        shader_name: &str,
        width: u32,
        height: u32,
    ) -> Result<SpriteKey> {
        let keys = self.texture_key(texture_name)
            .and_then(|texture| Ok((texture, self.shader_program_key(shader_name)?)));
        let (texture, shader_program) = match keys {
            Ok(keys) => keys,
            Err(error) => {
                engine_error!("battle_city::ResourceManager",
                    "Failed to load sprite '{}': {}", name, error);
                return Err(error);
            }
        };

        let sprite = Sprite::new(texture, shader_program, Vec2::new(width as f32, height as f32));
        let (key, replaced) = insert_named(&mut self.sprites, &mut self.sprite_names, name, sprite);
        log_stored("sprite", name, replaced.is_some());
        Ok(key)
    }

    // ===== LOOKUP =====

    pub fn shader_program_key(&self, name: &str) -> Result<ShaderProgramKey> {
        lookup_key(&self.shader_program_names, "shader program", name)
    }

    pub fn texture_key(&self, name: &str) -> Result<TextureKey> {
        lookup_key(&self.texture_names, "texture", name)
    }

    pub fn sprite_key(&self, name: &str) -> Result<SpriteKey> {
        lookup_key(&self.sprite_names, "sprite", name)
    }

    pub fn shader_program(&self, name: &str) -> Result<&ShaderProgram> {
        let key = self.shader_program_key(name)?;
        self.shader_programs.get(key).ok_or_else(|| not_found("shader program", name))
    }

    /// Mutable access, used to set uniforms such as the projection matrix
    pub fn shader_program_mut(&mut self, name: &str) -> Result<&mut ShaderProgram> {
        let key = self.shader_program_key(name)?;
        self.shader_programs.get_mut(key).ok_or_else(|| not_found("shader program", name))
    }

    pub fn texture(&self, name: &str) -> Result<&Texture2D> {
        let key = self.texture_key(name)?;
        self.textures.get(key).ok_or_else(|| not_found("texture", name))
    }

    pub fn sprite(&self, name: &str) -> Result<&Sprite> {
        let key = self.sprite_key(name)?;
        self.sprites.get(key).ok_or_else(|| not_found("sprite", name))
    }

    pub fn sprite_mut(&mut self, name: &str) -> Result<&mut Sprite> {
        let key = self.sprite_key(name)?;
        self.sprites.get_mut(key).ok_or_else(|| not_found("sprite", name))
    }

    pub fn shader_program_count(&self) -> usize {
        self.shader_programs.len()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }

    // ===== RENDERING =====

    /// Draw one sprite into `frame`
    ///
    /// # Errors
    ///
    /// `Error::ResourceNotFound` if the sprite, or the texture or program it
    /// references, is gone.
    pub fn render_sprite(&mut self, name: &str, frame: &dyn RendererFrame) -> Result<()> {
        let key = self.sprite_key(name)?;
        let sprite = self.sprites.get(key).ok_or_else(|| not_found("sprite", name))?;
        draw_sprite(name, sprite, &mut self.shader_programs, &self.textures, frame)
    }

    /// Draw every registered sprite into `frame`, in name order
    pub fn render_all_sprites(&mut self, frame: &dyn RendererFrame) -> Result<()> {
        let mut named: Vec<(&String, SpriteKey)> = self.sprite_names.iter()
            .map(|(name, key)| (name, *key))
            .collect();
        named.sort_by(|a, b| a.0.cmp(b.0));

        for (name, key) in named {
            let sprite = self.sprites.get(key).ok_or_else(|| not_found("sprite", name))?;
            draw_sprite(name, sprite, &mut self.shader_programs, &self.textures, frame)?;
        }
        Ok(())
    }

    fn build_shader_program(&self, vertex_path: &Path, fragment_path: &Path) -> Result<ShaderProgram> {
        let vertex_code = read_asset(&self.resolve_asset_path(vertex_path))?;
        let fragment_code = read_asset(&self.resolve_asset_path(fragment_path))?;
        let mut renderer = lock_renderer(&self.renderer)?;
        ShaderProgram::from_spirv(&mut *renderer, &vertex_code, &fragment_code)
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        // Sprites first, then the GPU objects they point at
        self.sprites.clear();
        self.textures.clear();
        self.shader_programs.clear();
    }
}

// ===== HELPERS =====

/// Store `value` under `name`, reusing the key already bound to that name.
/// Returns the key and the replaced value, if any.
fn insert_named<K: Key, V>(
    arena: &mut SlotMap<K, V>,
    names: &mut FxHashMap<String, K>,
    name: &str,
    value: V,
) -> (K, Option<V>) {
    if let Some(&key) = names.get(name) {
        if let Some(slot) = arena.get_mut(key) {
            let old = std::mem::replace(slot, value);
            return (key, Some(old));
        }
    }
    let key = arena.insert(value);
    names.insert(name.to_string(), key);
    (key, None)
}

fn lookup_key<K: Key>(names: &FxHashMap<String, K>, kind: &str, name: &str) -> Result<K> {
    names.get(name).copied().ok_or_else(|| not_found(kind, name))
}

fn not_found(kind: &str, name: &str) -> Error {
    Error::ResourceNotFound(format!("{} '{}'", kind, name))
}

fn log_stored(kind: &str, name: &str, replaced: bool) {
    if replaced {
        engine_info!("battle_city::ResourceManager", "Replaced {} '{}'", kind, name);
    } else {
        engine_info!("battle_city::ResourceManager", "Loaded {} '{}'", kind, name);
    }
}

fn read_asset(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| Error::FileReadFailed(format!("{}: {}", path.display(), e)))
}

fn lock_renderer(renderer: &Arc<Mutex<dyn Renderer>>) -> Result<MutexGuard<'_, dyn Renderer + 'static>> {
    renderer.lock().map_err(|_| Error::BackendError("Renderer lock poisoned".to_string()))
}

fn draw_sprite(
    name: &str,
    sprite: &Sprite,
    shader_programs: &mut SlotMap<ShaderProgramKey, ShaderProgram>,
    textures: &SlotMap<TextureKey, Texture2D>,
    frame: &dyn RendererFrame,
) -> Result<()> {
    let shader_program = shader_programs.get_mut(sprite.shader_program_key())
        .ok_or_else(|| Error::ResourceNotFound(format!("shader program of sprite '{}'", name)))?;
    let texture = textures.get(sprite.texture_key())
        .ok_or_else(|| Error::ResourceNotFound(format!("texture of sprite '{}'", name)))?;
    sprite.render(shader_program, texture, frame)
}

#[cfg(test)]
#[path = "resource_manager_tests.rs"]
mod tests;
