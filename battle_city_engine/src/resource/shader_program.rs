/// Resource-level shader program.
///
/// Wraps a linked `RendererShaderProgram` with a CPU copy of its uniform
/// block. Setters write into the block by reflected name; the block is
/// uploaded every time the program is used for drawing.

use std::sync::Arc;
use glam::{Mat4, Vec2, Vec3, Vec4};
use crate::error::Result;
use crate::renderer::{
    Renderer, RendererFrame, RendererShaderProgram, ShaderProgramDesc, UniformKind,
};
use crate::{engine_trace, engine_warn};

pub struct ShaderProgram {
    program: Arc<dyn RendererShaderProgram>,
    uniform_data: Vec<u8>,
}

impl ShaderProgram {
    /// Compile and link a program from SPIR-V vertex and fragment bytecode
    ///
    /// # Errors
    ///
    /// `Error::ShaderCompilationFailed` if either stage is rejected or the
    /// program fails to link.
    pub fn from_spirv(renderer: &mut dyn Renderer, vertex_code: &[u8], fragment_code: &[u8]) -> Result<Self> {
        let program = renderer.create_shader_program(ShaderProgramDesc::new(
            vertex_code.to_vec(),
            fragment_code.to_vec(),
        ))?;
        Ok(Self::new(program))
    }

    pub fn new(program: Arc<dyn RendererShaderProgram>) -> Self {
        let block_size = program.uniform_layout().block_size() as usize;
        Self {
            program,
            uniform_data: vec![0u8; block_size],
        }
    }

    /// Whether the underlying GPU program is usable
    pub fn is_valid(&self) -> bool {
        self.program.is_valid()
    }

    /// Bind this program and upload its uniforms
    ///
    /// Skipped without error when the program handle is invalid.
    pub fn use_program(&self, frame: &dyn RendererFrame) -> Result<()> {
        if !self.is_valid() {
            engine_trace!("battle_city::ShaderProgram", "use_program skipped: invalid program handle");
            return Ok(());
        }
        frame.bind_shader_program(&self.program)?;
        if !self.uniform_data.is_empty() {
            frame.push_uniforms(&self.uniform_data)?;
        }
        Ok(())
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        // Sampler units are fixed by the shader's binding declaration
        if let Some(UniformKind::Sampler { unit }) = self.program.uniform_layout().find(name).map(|u| u.kind) {
            if value < 0 || value as u32 != unit {
                engine_warn!("battle_city::ShaderProgram",
                    "Sampler '{}' is bound to texture unit {}, ignoring set_int({})", name, unit, value);
            }
            return;
        }
        self.write_uniform(name, UniformKind::Int, bytemuck::bytes_of(&value));
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.write_uniform(name, UniformKind::Float, bytemuck::bytes_of(&value));
    }

    pub fn set_vector2(&mut self, name: &str, value: Vec2) {
        self.write_uniform(name, UniformKind::Vec2, bytemuck::bytes_of(&value));
    }

    pub fn set_vector3(&mut self, name: &str, value: Vec3) {
        self.write_uniform(name, UniformKind::Vec3, bytemuck::bytes_of(&value));
    }

    pub fn set_vector4(&mut self, name: &str, value: Vec4) {
        self.write_uniform(name, UniformKind::Vec4, bytemuck::bytes_of(&value));
    }

    /// Column-major, as the shader expects
    pub fn set_matrix4(&mut self, name: &str, value: Mat4) {
        self.write_uniform(name, UniformKind::Mat4, bytemuck::bytes_of(&value));
    }

    /// Current contents of the uniform block
    pub fn uniform_data(&self) -> &[u8] {
        &self.uniform_data
    }

    pub fn render_program(&self) -> &Arc<dyn RendererShaderProgram> {
        &self.program
    }

    fn write_uniform(&mut self, name: &str, kind: UniformKind, bytes: &[u8]) {
        let Some(uniform) = self.program.uniform_layout().find(name) else {
            engine_trace!("battle_city::ShaderProgram", "No uniform named '{}', value ignored", name);
            return;
        };
        if uniform.kind != kind {
            engine_warn!("battle_city::ShaderProgram",
                "Uniform '{}' is {:?}, cannot set it as {:?}", name, uniform.kind, kind);
            return;
        }
        let start = uniform.offset as usize;
        self.uniform_data[start..start + bytes.len()].copy_from_slice(bytes);
    }
}

#[cfg(test)]
#[path = "shader_program_tests.rs"]
mod tests;
