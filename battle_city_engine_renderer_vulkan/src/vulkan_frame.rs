/// Frame - Vulkan implementation of the RendererFrame trait

use ash::vk;
use battle_city_engine::battle_city::{Error, Result};
use battle_city_engine::battle_city::render::{
    RendererFrame, RendererShaderProgram, RendererTexture, MAX_TEXTURE_UNITS,
};
use battle_city_engine::engine_err;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::vulkan_format::UNIFORM_STAGES;
use crate::vulkan_shader_program::ShaderProgram;
use crate::vulkan_texture::Texture;

/// Pipeline state tracked while recording
#[derive(Debug, Default)]
pub(crate) struct FrameState {
    /// Layout and push-constant size of the bound program
    pub bound: Option<(vk::PipelineLayout, u32)>,
    pub draw_calls: u32,
    pub triangles: u32,
}

pub struct Frame {
    pub(crate) device: ash::Device,
    pub(crate) command_buffer: vk::CommandBuffer,
    pub(crate) image_index: u32,
    pub(crate) state: Mutex<FrameState>,
}

impl Frame {
    pub(crate) fn new(device: ash::Device, command_buffer: vk::CommandBuffer, image_index: u32) -> Self {
        Self {
            device,
            command_buffer,
            image_index,
            state: Mutex::new(FrameState::default()),
        }
    }

    pub(crate) fn lock_state(&self) -> Result<MutexGuard<'_, FrameState>> {
        self.state.lock()
            .map_err(|_| engine_err!("battle_city::vulkan", "Frame state lock poisoned"))
    }

    fn bound_program(&self, command: &str) -> Result<(vk::PipelineLayout, u32)> {
        self.lock_state()?
            .bound
            .ok_or_else(|| engine_err!("battle_city::vulkan", "{}: no shader program bound", command))
    }
}

impl RendererFrame for Frame {
    fn bind_shader_program(&self, program: &Arc<dyn RendererShaderProgram>) -> Result<()> {
        if !program.is_valid() {
            return Err(Error::InvalidResource("shader program is not linked".to_string()));
        }

        // Downcast to the Vulkan program
        let vulkan_program = program.as_ref() as *const dyn RendererShaderProgram as *const ShaderProgram;

        unsafe {
            let vulkan_program = &*vulkan_program;

            self.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vulkan_program.pipeline,
            );

            self.lock_state()?.bound = Some((vulkan_program.layout, vulkan_program.push_constant_size()));
        }
        Ok(())
    }

    fn bind_texture(&self, unit: u32, texture: &Arc<dyn RendererTexture>) -> Result<()> {
        if unit >= MAX_TEXTURE_UNITS {
            return Err(Error::InvalidResource(format!(
                "texture unit {} out of range (max {})", unit, MAX_TEXTURE_UNITS
            )));
        }
        let (layout, _) = self.bound_program("bind_texture")?;

        // Downcast to the Vulkan texture
        let vulkan_texture = texture.as_ref() as *const dyn RendererTexture as *const Texture;

        unsafe {
            let vulkan_texture = &*vulkan_texture;

            // Texture unit N is descriptor set N
            self.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                unit,
                &[vulkan_texture.descriptor_set],
                &[],
            );
        }
        Ok(())
    }

    fn push_uniforms(&self, data: &[u8]) -> Result<()> {
        let (layout, range_size) = self.bound_program("push_uniforms")?;
        if data.is_empty() {
            return Ok(());
        }
        if data.len() as u32 > range_size || data.len() % 4 != 0 {
            return Err(Error::InvalidResource(format!(
                "uniform block of {} bytes does not fit the {} byte push-constant range",
                data.len(), range_size
            )));
        }

        unsafe {
            self.device.cmd_push_constants(self.command_buffer, layout, UNIFORM_STAGES, 0, data);
        }
        Ok(())
    }

    fn draw(&self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.bound_program("draw")?;

        unsafe {
            self.device.cmd_draw(self.command_buffer, vertex_count, 1, first_vertex, 0);
        }

        let mut state = self.lock_state()?;
        state.draw_calls += 1;
        state.triangles += vertex_count / 3;
        Ok(())
    }
}
