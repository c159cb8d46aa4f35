/// ShaderProgram - Vulkan implementation of the RendererShaderProgram trait
///
/// A linked vertex + fragment pair is a graphics pipeline. The uniform
/// block is the push-constant range; samplers are combined image samplers
/// at binding 0 of the set matching their texture unit.

use ash::vk;
use battle_city_engine::battle_city::{Error, Result};
use battle_city_engine::battle_city::render::{
    validate_spirv, ReflectedUniform, RendererShaderProgram, ShaderProgramDesc, ShaderStage,
    UniformKind, UniformLayout, MAX_TEXTURE_UNITS,
};
use battle_city_engine::{engine_debug, engine_err, engine_trace};
use std::ffi::CString;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{spirq_type_to_uniform_kind, UNIFORM_STAGES};

pub struct ShaderProgram {
    ctx: Arc<GpuContext>,
    pub(crate) pipeline: vk::Pipeline,
    pub(crate) layout: vk::PipelineLayout,
    uniforms: UniformLayout,
}

impl ShaderProgram {
    /// Validate, reflect and link both stages into a pipeline for `render_pass`
    pub(crate) fn create(ctx: &Arc<GpuContext>, render_pass: vk::RenderPass, desc: &ShaderProgramDesc) -> Result<Self> {
        let vertex_words = validate_spirv(ShaderStage::Vertex, &desc.vertex_code)?;
        let fragment_words = validate_spirv(ShaderStage::Fragment, &desc.fragment_code)?;

        let uniforms = reflect_uniforms(&vertex_words, &fragment_words)?;
        engine_debug!("battle_city::vulkan", "Reflected {} uniforms, {} byte block",
            uniforms.uniforms().len(), uniforms.block_size());

        let entry_point = CString::new(desc.entry_point.as_str())
            .map_err(|e| Error::ShaderCompilationFailed(format!("invalid entry point: {}", e)))?;

        let mut program = Self {
            ctx: Arc::clone(ctx),
            pipeline: vk::Pipeline::null(),
            layout: vk::PipelineLayout::null(),
            uniforms,
        };

        unsafe {
            let device = &ctx.device;

            let vertex_module = create_module(device, ShaderStage::Vertex, &vertex_words)?;
            let fragment_module = match create_module(device, ShaderStage::Fragment, &fragment_words) {
                Ok(module) => module,
                Err(e) => {
                    device.destroy_shader_module(vertex_module, None);
                    return Err(e);
                }
            };

            let result = program.create_pipeline(render_pass, vertex_module, fragment_module, &entry_point);

            device.destroy_shader_module(vertex_module, None);
            device.destroy_shader_module(fragment_module, None);
            result?;
        }

        Ok(program)
    }

    /// Size of the push-constant range, rounded up to a multiple of 4
    pub(crate) fn push_constant_size(&self) -> u32 {
        (self.uniforms.block_size() + 3) & !3
    }

    unsafe fn create_pipeline(
        &mut self,
        render_pass: vk::RenderPass,
        vertex_module: vk::ShaderModule,
        fragment_module: vk::ShaderModule,
        entry_point: &CString,
    ) -> Result<()> {
        let device = &self.ctx.device;

        let set_layouts = self.ctx.pipeline_set_layouts();
        let push_constant_ranges = [vk::PushConstantRange {
            stage_flags: UNIFORM_STAGES,
            offset: 0,
            size: self.push_constant_size(),
        }];
        let ranges: &[vk::PushConstantRange] = if self.push_constant_size() > 0 {
            &push_constant_ranges
        } else {
            &[]
        };

        let layout_create_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&set_layouts)
            .push_constant_ranges(ranges);
        self.layout = device.create_pipeline_layout(&layout_create_info, None)
            .map_err(|e| engine_err!("battle_city::vulkan", "Failed to create pipeline layout: {:?}", e))?;

        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vertex_module)
                .name(entry_point),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(fragment_module)
                .name(entry_point),
        ];

        // Quad corners come from gl_VertexIndex
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default();

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        // Viewport state (dynamic)
        let viewports = [vk::Viewport::default()];
        let scissors = [vk::Rect2D::default()];
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewports(&viewports)
            .scissors(&scissors);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::NONE)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .depth_bias_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        // Straight alpha blending for sprites with transparent texels
        let color_blend_attachment = vk::PipelineColorBlendAttachmentState::default()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(true)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .alpha_blend_op(vk::BlendOp::ADD);

        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(std::slice::from_ref(&color_blend_attachment));

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default()
            .dynamic_states(&dynamic_states);

        let pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(self.layout)
            .render_pass(render_pass)
            .subpass(0);

        let pipelines = device.create_graphics_pipelines(
            vk::PipelineCache::null(),
            &[pipeline_create_info],
            None,
        )
        .map_err(|(_, e)| Error::ShaderCompilationFailed(format!("pipeline link failed: {:?}", e)))?;

        self.pipeline = pipelines
            .into_iter()
            .next()
            .ok_or_else(|| Error::ShaderCompilationFailed("pipeline link returned nothing".to_string()))?;
        Ok(())
    }
}

impl RendererShaderProgram for ShaderProgram {
    fn is_valid(&self) -> bool {
        self.pipeline != vk::Pipeline::null()
    }

    fn uniform_layout(&self) -> &UniformLayout {
        &self.uniforms
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        unsafe {
            // A frame in flight may still use this pipeline
            self.ctx.device.device_wait_idle().ok();

            if self.pipeline != vk::Pipeline::null() {
                self.ctx.device.destroy_pipeline(self.pipeline, None);
            }
            if self.layout != vk::PipelineLayout::null() {
                self.ctx.device.destroy_pipeline_layout(self.layout, None);
            }
        }
    }
}

unsafe fn create_module(device: &ash::Device, stage: ShaderStage, words: &[u32]) -> Result<vk::ShaderModule> {
    let create_info = vk::ShaderModuleCreateInfo::default().code(words);
    device.create_shader_module(&create_info, None)
        .map_err(|e| Error::ShaderCompilationFailed(format!("{} stage: {:?}", stage.name(), e)))
}

/// Build the uniform layout of a program from both stages.
///
/// Push-constant members become block uniforms; combined image samplers
/// become sampler uniforms whose unit is their descriptor set. A name
/// declared by both stages must agree on its location.
pub(crate) fn reflect_uniforms(vertex: &[u32], fragment: &[u32]) -> Result<UniformLayout> {
    let mut uniforms: Vec<ReflectedUniform> = Vec::new();
    let mut block_size = 0u32;

    for (stage, words) in [(ShaderStage::Vertex, vertex), (ShaderStage::Fragment, fragment)] {
        let (stage_uniforms, stage_block) = reflect_stage(stage, words)?;
        block_size = block_size.max(stage_block);

        for uniform in stage_uniforms {
            match uniforms.iter().find(|u| u.name == uniform.name) {
                Some(existing) if *existing == uniform => {}
                Some(existing) => {
                    return Err(Error::ShaderCompilationFailed(format!(
                        "uniform '{}' differs between stages ({:?} at {} vs {:?} at {})",
                        uniform.name, existing.kind, existing.offset, uniform.kind, uniform.offset
                    )));
                }
                None => uniforms.push(uniform),
            }
        }
    }

    UniformLayout::new(uniforms, block_size)
}

fn reflect_stage(stage: ShaderStage, words: &[u32]) -> Result<(Vec<ReflectedUniform>, u32)> {
    let entry_points = spirq::ReflectConfig::new()
        .spv(words)
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| Error::ShaderCompilationFailed(format!(
            "{} stage: SPIR-V reflection failed: {:?}", stage.name(), e
        )))?;

    let mut uniforms = Vec::new();
    let mut block_size = 0u32;

    for entry_point in &entry_points {
        for var in entry_point.vars.iter() {
            match var {
                spirq::var::Variable::PushConstant { ty, .. } => {
                    block_size = block_size.max(ty.nbyte().unwrap_or(0) as u32);
                    if let spirq::ty::Type::Struct(st) = ty {
                        for member in &st.members {
                            let name = member.name.clone().unwrap_or_default();
                            let offset = member.offset.unwrap_or(0) as u32;
                            match spirq_type_to_uniform_kind(&member.ty) {
                                Some(kind) => uniforms.push(ReflectedUniform { name, offset, kind }),
                                None => engine_trace!("battle_city::vulkan",
                                    "{} stage: skipping uniform '{}' of unsupported type", stage.name(), name),
                            }
                        }
                    }
                }
                spirq::var::Variable::Descriptor { name, desc_bind, desc_ty, .. } => {
                    let name = name.clone().unwrap_or_default();
                    if !matches!(desc_ty, spirq::ty::DescriptorType::CombinedImageSampler()) {
                        return Err(Error::ShaderCompilationFailed(format!(
                            "{} stage: '{}' uses unsupported descriptor type {:?}", stage.name(), name, desc_ty
                        )));
                    }
                    if desc_bind.set() >= MAX_TEXTURE_UNITS || desc_bind.bind() != 0 {
                        return Err(Error::ShaderCompilationFailed(format!(
                            "{} stage: sampler '{}' must use binding 0 of a set below {}, found set {} binding {}",
                            stage.name(), name, MAX_TEXTURE_UNITS, desc_bind.set(), desc_bind.bind()
                        )));
                    }
                    uniforms.push(ReflectedUniform {
                        name,
                        offset: 0,
                        kind: UniformKind::Sampler { unit: desc_bind.set() },
                    });
                }
                _ => {}
            }
        }
    }

    Ok((uniforms, block_size))
}
