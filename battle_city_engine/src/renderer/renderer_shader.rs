/// Shader program trait, descriptor, and reflected uniform layout

use crate::error::{Error, Result};

/// First word of every SPIR-V module
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Maximum size in bytes of a program's uniform block
pub const MAX_UNIFORM_BLOCK_SIZE: u32 = 128;

/// Shader stage of a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn name(&self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

/// Descriptor for creating a shader program
#[derive(Debug, Clone)]
pub struct ShaderProgramDesc {
    /// SPIR-V bytecode of the vertex stage
    pub vertex_code: Vec<u8>,
    /// SPIR-V bytecode of the fragment stage
    pub fragment_code: Vec<u8>,
    /// Entry point shared by both stages
    pub entry_point: String,
}

impl ShaderProgramDesc {
    pub fn new(vertex_code: Vec<u8>, fragment_code: Vec<u8>) -> Self {
        Self {
            vertex_code,
            fragment_code,
            entry_point: "main".to_string(),
        }
    }

    pub fn code(&self, stage: ShaderStage) -> &[u8] {
        match stage {
            ShaderStage::Vertex => &self.vertex_code,
            ShaderStage::Fragment => &self.fragment_code,
        }
    }
}

/// Check the SPIR-V header of one stage and return it as words
///
/// The module must be non-empty, a whole number of 32-bit words, at least
/// as long as the 5-word header, and start with the SPIR-V magic number.
pub fn validate_spirv(stage: ShaderStage, code: &[u8]) -> Result<Vec<u32>> {
    if code.is_empty() {
        return Err(Error::ShaderCompilationFailed(format!(
            "{} stage: empty module", stage.name()
        )));
    }
    if code.len() % 4 != 0 {
        return Err(Error::ShaderCompilationFailed(format!(
            "{} stage: {} bytes is not a multiple of 4", stage.name(), code.len()
        )));
    }
    if code.len() < 20 {
        return Err(Error::ShaderCompilationFailed(format!(
            "{} stage: module shorter than the SPIR-V header", stage.name()
        )));
    }

    let words: Vec<u32> = code
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    if words[0] != SPIRV_MAGIC {
        return Err(Error::ShaderCompilationFailed(format!(
            "{} stage: bad magic number 0x{:08x}", stage.name(), words[0]
        )));
    }

    Ok(words)
}

// ===== UNIFORM REFLECTION =====

/// Type of a uniform exposed by a shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
    /// Combined image sampler bound to a texture unit
    Sampler { unit: u32 },
}

impl UniformKind {
    /// Bytes occupied in the uniform block (samplers occupy none)
    pub fn byte_size(&self) -> u32 {
        match self {
            UniformKind::Int | UniformKind::Float => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 => 12,
            UniformKind::Vec4 => 16,
            UniformKind::Mat4 => 64,
            UniformKind::Sampler { .. } => 0,
        }
    }
}

/// One reflected uniform
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectedUniform {
    pub name: String,
    /// Byte offset inside the uniform block (0 for samplers)
    pub offset: u32,
    pub kind: UniformKind,
}

/// Uniform layout of a linked program
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformLayout {
    uniforms: Vec<ReflectedUniform>,
    block_size: u32,
}

impl UniformLayout {
    /// Build a layout, rejecting members that overflow the block
    pub fn new(uniforms: Vec<ReflectedUniform>, block_size: u32) -> Result<Self> {
        if block_size > MAX_UNIFORM_BLOCK_SIZE {
            return Err(Error::ShaderCompilationFailed(format!(
                "uniform block of {} bytes exceeds the {} byte limit",
                block_size, MAX_UNIFORM_BLOCK_SIZE
            )));
        }
        for uniform in &uniforms {
            if uniform.offset + uniform.kind.byte_size() > block_size {
                return Err(Error::ShaderCompilationFailed(format!(
                    "uniform '{}' at offset {} overflows the {} byte block",
                    uniform.name, uniform.offset, block_size
                )));
            }
        }
        Ok(Self { uniforms, block_size })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Find a uniform by name
    pub fn find(&self, name: &str) -> Option<&ReflectedUniform> {
        self.uniforms.iter().find(|u| u.name == name)
    }

    pub fn uniforms(&self) -> &[ReflectedUniform] {
        &self.uniforms
    }

    /// Size in bytes of the uniform block
    pub fn block_size(&self) -> u32 {
        self.block_size
    }
}

// ===== SHADER PROGRAM TRAIT =====

/// Linked shader program trait
///
/// Implemented by backend-specific program types (a Vulkan graphics pipeline).
pub trait RendererShaderProgram: Send + Sync {
    /// Whether the program holds a usable GPU handle
    fn is_valid(&self) -> bool;

    /// Uniforms reflected from both stages
    fn uniform_layout(&self) -> &UniformLayout;
}

#[cfg(test)]
#[path = "renderer_shader_tests.rs"]
mod tests;
