/// Mock Renderer for unit tests (no GPU required)
///
/// Lets ResourceManager, ShaderProgram, Texture2D and Sprite be tested
/// without a real graphics backend. Shader bytecode goes through the same
/// SPIR-V header validation as a real backend, textures count how many are
/// alive, and frames record the commands issued to them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::engine_bail;
use crate::error::{Error, Result};
use crate::renderer::{
    validate_spirv, Renderer, RendererFrame, RendererShaderProgram, RendererStats,
    RendererTexture, ReflectedUniform, ShaderProgramDesc, ShaderStage, TextureDesc,
    TextureInfo, UniformKind, UniformLayout, MAX_TEXTURE_UNITS, SPIRV_MAGIC,
};

/// Smallest module that passes SPIR-V header validation
pub fn spirv_stub() -> Vec<u8> {
    [SPIRV_MAGIC, 0x0001_0000, 0, 8, 0]
        .iter()
        .flat_map(|w| w.to_le_bytes())
        .collect()
}

/// Layout of the sprite shader: two matrices and one sampler on unit 0
pub fn sprite_uniform_layout() -> UniformLayout {
    UniformLayout::new(
        vec![
            ReflectedUniform { name: "modelMat".to_string(), offset: 0, kind: UniformKind::Mat4 },
            ReflectedUniform { name: "projectionMat".to_string(), offset: 64, kind: UniformKind::Mat4 },
            ReflectedUniform { name: "tex".to_string(), offset: 0, kind: UniformKind::Sampler { unit: 0 } },
        ],
        128,
    )
    .unwrap()
}

// ============================================================================
// Mock Texture
// ============================================================================

#[derive(Debug)]
pub struct MockTexture {
    pub info: TextureInfo,
    pub name: String,
    live: Arc<AtomicUsize>,
}

impl MockTexture {
    pub fn new(info: TextureInfo, name: String, live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self { info, name, live }
    }
}

impl RendererTexture for MockTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }
}

impl Drop for MockTexture {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Mock ShaderProgram
// ============================================================================

#[derive(Debug)]
pub struct MockShaderProgram {
    pub name: String,
    pub valid: bool,
    pub layout: UniformLayout,
}

impl MockShaderProgram {
    pub fn new(name: String, layout: UniformLayout) -> Self {
        Self { name, valid: true, layout }
    }

    /// A program whose GPU handle is gone
    pub fn invalid(name: String, layout: UniformLayout) -> Self {
        Self { name, valid: false, layout }
    }
}

impl RendererShaderProgram for MockShaderProgram {
    fn is_valid(&self) -> bool {
        self.valid
    }

    fn uniform_layout(&self) -> &UniformLayout {
        &self.layout
    }
}

// ============================================================================
// Mock Frame
// ============================================================================

/// Frame that records every command as a string
#[derive(Debug, Default)]
pub struct MockFrame {
    pub commands: Mutex<Vec<String>>,
    /// Every uniform block pushed, in order
    pub pushed_uniforms: Mutex<Vec<Vec<u8>>>,
    program_bound: Mutex<bool>,
}

impl MockFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn last_pushed_uniforms(&self) -> Option<Vec<u8>> {
        self.pushed_uniforms.lock().unwrap().last().cloned()
    }

    fn record(&self, command: String) {
        self.commands.lock().unwrap().push(command);
    }

    fn require_program(&self, command: &str) -> Result<()> {
        if !*self.program_bound.lock().unwrap() {
            engine_bail!("battle_city::mock", "{}: no shader program bound", command);
        }
        Ok(())
    }
}

impl RendererFrame for MockFrame {
    fn bind_shader_program(&self, _program: &Arc<dyn RendererShaderProgram>) -> Result<()> {
        *self.program_bound.lock().unwrap() = true;
        self.record("bind_shader_program".to_string());
        Ok(())
    }

    fn bind_texture(&self, unit: u32, texture: &Arc<dyn RendererTexture>) -> Result<()> {
        self.require_program("bind_texture")?;
        if unit >= MAX_TEXTURE_UNITS {
            return Err(Error::InvalidResource(format!(
                "texture unit {} out of range (max {})", unit, MAX_TEXTURE_UNITS
            )));
        }
        let info = texture.info();
        self.record(format!("bind_texture({}, {}x{})", unit, info.width, info.height));
        Ok(())
    }

    fn push_uniforms(&self, data: &[u8]) -> Result<()> {
        self.require_program("push_uniforms")?;
        self.pushed_uniforms.lock().unwrap().push(data.to_vec());
        self.record(format!("push_uniforms({})", data.len()));
        Ok(())
    }

    fn draw(&self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.require_program("draw")?;
        self.record(format!("draw({}, {})", vertex_count, first_vertex));
        Ok(())
    }
}

// ============================================================================
// Mock Renderer
// ============================================================================

/// Mock Renderer that tracks created resources without GPU
#[derive(Debug)]
pub struct MockRenderer {
    /// Track created textures
    pub created_textures: Arc<Mutex<Vec<String>>>,
    /// Track created shader programs
    pub created_programs: Arc<Mutex<Vec<String>>>,
    /// Number of textures not yet dropped
    pub live_textures: Arc<AtomicUsize>,
    /// Layout handed to every created program
    pub uniform_layout: UniformLayout,
    pub clear_color: [f32; 4],
    pub frames_presented: u32,
    pub skip_frames: bool,
    pub last_size: (u32, u32),
}

impl MockRenderer {
    pub fn new() -> Self {
        Self {
            created_textures: Arc::new(Mutex::new(Vec::new())),
            created_programs: Arc::new(Mutex::new(Vec::new())),
            live_textures: Arc::new(AtomicUsize::new(0)),
            uniform_layout: sprite_uniform_layout(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            frames_presented: 0,
            skip_frames: false,
            last_size: (0, 0),
        }
    }

    /// Get names of created textures
    pub fn get_created_textures(&self) -> Vec<String> {
        self.created_textures.lock().unwrap().clone()
    }

    /// Get names of created shader programs
    pub fn get_created_programs(&self) -> Vec<String> {
        self.created_programs.lock().unwrap().clone()
    }

    pub fn live_texture_count(&self) -> usize {
        self.live_textures.load(Ordering::SeqCst)
    }
}

impl Renderer for MockRenderer {
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn RendererTexture>> {
        if desc.data.len() != desc.expected_data_len() {
            engine_bail!("battle_city::mock",
                "texture data is {} bytes, expected {}", desc.data.len(), desc.expected_data_len());
        }
        let name = format!("texture_{}x{}", desc.width, desc.height);
        self.created_textures.lock().unwrap().push(name.clone());
        let info = TextureInfo {
            width: desc.width,
            height: desc.height,
            format: desc.format,
            mip_levels: desc.mipmap.mip_levels(desc.width, desc.height),
        };
        Ok(Arc::new(MockTexture::new(info, name, Arc::clone(&self.live_textures))))
    }

    fn create_shader_program(&mut self, desc: ShaderProgramDesc) -> Result<Arc<dyn RendererShaderProgram>> {
        validate_spirv(ShaderStage::Vertex, &desc.vertex_code)?;
        validate_spirv(ShaderStage::Fragment, &desc.fragment_code)?;
        let name = format!("program_{}", self.created_programs.lock().unwrap().len());
        self.created_programs.lock().unwrap().push(name.clone());
        Ok(Arc::new(MockShaderProgram::new(name, self.uniform_layout.clone())))
    }

    fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    fn begin_frame(&mut self) -> Result<Option<Arc<dyn RendererFrame>>> {
        if self.skip_frames {
            return Ok(None);
        }
        Ok(Some(Arc::new(MockFrame::new())))
    }

    fn end_frame(&mut self, _frame: Arc<dyn RendererFrame>) -> Result<()> {
        self.frames_presented += 1;
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        Ok(())
    }

    fn stats(&self) -> RendererStats {
        RendererStats::default()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.last_size = (width, height);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "mock_renderer_tests.rs"]
mod tests;
