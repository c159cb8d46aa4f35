/// Texture - Vulkan implementation of the RendererTexture trait
///
/// Owns the image, its view, its memory and the descriptor set that binds
/// it to a texture unit. Pixels go through a staging buffer; mip levels
/// are generated on the GPU with a blit chain.

use ash::vk;
use battle_city_engine::battle_city::{Error, Result};
use battle_city_engine::battle_city::render::{RendererTexture, TextureDesc, TextureInfo};
use battle_city_engine::{engine_err, engine_error, engine_warn};
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::texture_format_to_vk;

pub struct Texture {
    ctx: Arc<GpuContext>,
    pub(crate) image: vk::Image,
    pub(crate) view: vk::ImageView,
    allocation: Option<Allocation>,
    allocation_size: u64,
    /// Pool the descriptor set came from (null until allocated)
    descriptor_pool: vk::DescriptorPool,
    pub(crate) descriptor_set: vk::DescriptorSet,
    info: TextureInfo,
}

impl Texture {
    /// Create a sampled texture and upload `desc.data` into it
    pub(crate) fn create(ctx: &Arc<GpuContext>, desc: &TextureDesc, sampler: vk::Sampler) -> Result<Self> {
        if desc.width == 0 || desc.height == 0 {
            return Err(Error::InvalidResource(format!(
                "texture size {}x{} is empty", desc.width, desc.height
            )));
        }
        if desc.data.len() != desc.expected_data_len() {
            return Err(Error::InvalidResource(format!(
                "texture data is {} bytes, expected {}", desc.data.len(), desc.expected_data_len()
            )));
        }

        let format = texture_format_to_vk(desc.format);
        let mut mip_levels = desc.mipmap.mip_levels(desc.width, desc.height);
        if mip_levels > 1 && !ctx.supports_linear_blit(format) {
            engine_warn!("battle_city::vulkan",
                "{:?} does not support linear blits, skipping mipmap generation", format);
            mip_levels = 1;
        }

        let mut usage = vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST;
        if mip_levels > 1 {
            usage |= vk::ImageUsageFlags::TRANSFER_SRC;
        }

        let image_create_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D { width: desc.width, height: desc.height, depth: 1 })
            .mip_levels(mip_levels)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        // From here on, `texture` releases whatever was created if a later step fails
        let mut texture = Self {
            ctx: Arc::clone(ctx),
            image: vk::Image::null(),
            view: vk::ImageView::null(),
            allocation: None,
            allocation_size: 0,
            descriptor_pool: vk::DescriptorPool::null(),
            descriptor_set: vk::DescriptorSet::null(),
            info: TextureInfo {
                width: desc.width,
                height: desc.height,
                format: desc.format,
                mip_levels,
            },
        };

        unsafe {
            let device = &ctx.device;

            texture.image = device.create_image(&image_create_info, None)
                .map_err(|e| engine_err!("battle_city::vulkan", "Failed to create texture image: {:?}", e))?;

            let requirements = device.get_image_memory_requirements(texture.image);
            let allocation = ctx.lock_allocator()?
                .allocate(&AllocationCreateDesc {
                    name: "texture",
                    requirements,
                    location: MemoryLocation::GpuOnly,
                    linear: false,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|_| {
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!("battle_city::vulkan", "Out of GPU memory for texture (size: {}x{}, {:.2} MB)",
                        desc.width, desc.height, size_mb);
                    Error::OutOfMemory
                })?;

            device.bind_image_memory(texture.image, allocation.memory(), allocation.offset())
                .map_err(|e| engine_err!("battle_city::vulkan", "Failed to bind texture image memory: {:?}", e))?;
            texture.allocation_size = allocation.size();
            texture.allocation = Some(allocation);
            ctx.track_texture_memory(texture.allocation_size);

            let view_create_info = vk::ImageViewCreateInfo::default()
                .image(texture.image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .components(vk::ComponentMapping::default())
                .subresource_range(color_range(0, mip_levels));

            texture.view = device.create_image_view(&view_create_info, None)
                .map_err(|e| engine_err!("battle_city::vulkan", "Failed to create texture image view: {:?}", e))?;
        }

        texture.upload(&desc.data)?;
        texture.write_descriptor(sampler)?;
        Ok(texture)
    }

    fn upload(&self, pixels: &[u8]) -> Result<()> {
        let staging = StagingBuffer::new(&self.ctx, pixels)?;
        let image = self.image;
        let width = self.info.width;
        let height = self.info.height;
        let mip_levels = self.info.mip_levels;
        let device = &self.ctx.device;

        self.ctx.submit_one_shot(|command_buffer| unsafe {
            // All levels: UNDEFINED -> TRANSFER_DST
            transition(
                device, command_buffer, image, color_range(0, mip_levels),
                (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL),
                (vk::AccessFlags::empty(), vk::AccessFlags::TRANSFER_WRITE),
                (vk::PipelineStageFlags::TOP_OF_PIPE, vk::PipelineStageFlags::TRANSFER),
            );

            let region = vk::BufferImageCopy::default()
                .buffer_offset(0)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(color_layers(0))
                .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                .image_extent(vk::Extent3D { width, height, depth: 1 });

            device.cmd_copy_buffer_to_image(
                command_buffer,
                staging.buffer,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );

            for mip in 1..mip_levels {
                let src_mip = mip - 1;

                transition(
                    device, command_buffer, image, color_range(src_mip, 1),
                    (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::TRANSFER_SRC_OPTIMAL),
                    (vk::AccessFlags::TRANSFER_WRITE, vk::AccessFlags::TRANSFER_READ),
                    (vk::PipelineStageFlags::TRANSFER, vk::PipelineStageFlags::TRANSFER),
                );

                let blit = vk::ImageBlit::default()
                    .src_subresource(color_layers(src_mip))
                    .src_offsets([vk::Offset3D::default(), mip_corner(width, height, src_mip)])
                    .dst_subresource(color_layers(mip))
                    .dst_offsets([vk::Offset3D::default(), mip_corner(width, height, mip)]);

                device.cmd_blit_image(
                    command_buffer,
                    image,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[blit],
                    vk::Filter::LINEAR,
                );

                transition(
                    device, command_buffer, image, color_range(src_mip, 1),
                    (vk::ImageLayout::TRANSFER_SRC_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
                    (vk::AccessFlags::TRANSFER_READ, vk::AccessFlags::SHADER_READ),
                    (vk::PipelineStageFlags::TRANSFER, vk::PipelineStageFlags::FRAGMENT_SHADER),
                );
            }

            // Last level was only ever written
            transition(
                device, command_buffer, image, color_range(mip_levels - 1, 1),
                (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
                (vk::AccessFlags::TRANSFER_WRITE, vk::AccessFlags::SHADER_READ),
                (vk::PipelineStageFlags::TRANSFER, vk::PipelineStageFlags::FRAGMENT_SHADER),
            );
        })
    }

    fn write_descriptor(&mut self, sampler: vk::Sampler) -> Result<()> {
        let (pool, set) = self.ctx.allocate_texture_set()?;
        self.descriptor_pool = pool;
        self.descriptor_set = set;

        let image_info = vk::DescriptorImageInfo::default()
            .sampler(sampler)
            .image_view(self.view)
            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);

        let write = vk::WriteDescriptorSet::default()
            .dst_set(set)
            .dst_binding(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(std::slice::from_ref(&image_info));

        unsafe {
            self.ctx.device.update_descriptor_sets(&[write], &[]);
        }
        Ok(())
    }
}

impl RendererTexture for Texture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            // A frame in flight may still sample this image
            self.ctx.device.device_wait_idle().ok();

            if self.descriptor_set != vk::DescriptorSet::null() {
                self.ctx.free_texture_set(self.descriptor_pool, self.descriptor_set);
            }
            if self.view != vk::ImageView::null() {
                self.ctx.device.destroy_image_view(self.view, None);
            }
            if let Some(allocation) = self.allocation.take() {
                self.ctx.untrack_texture_memory(self.allocation_size);
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
            if self.image != vk::Image::null() {
                self.ctx.device.destroy_image(self.image, None);
            }
        }
    }
}

/// Host-visible buffer holding pixels for one upload
struct StagingBuffer<'a> {
    ctx: &'a GpuContext,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
}

impl<'a> StagingBuffer<'a> {
    fn new(ctx: &'a GpuContext, data: &[u8]) -> Result<Self> {
        let mut staging = Self {
            ctx,
            buffer: vk::Buffer::null(),
            allocation: None,
        };

        unsafe {
            let create_info = vk::BufferCreateInfo::default()
                .size(data.len() as u64)
                .usage(vk::BufferUsageFlags::TRANSFER_SRC)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            staging.buffer = ctx.device.create_buffer(&create_info, None)
                .map_err(|e| engine_err!("battle_city::vulkan", "Failed to create staging buffer: {:?}", e))?;

            let requirements = ctx.device.get_buffer_memory_requirements(staging.buffer);
            let allocation = ctx.lock_allocator()?
                .allocate(&AllocationCreateDesc {
                    name: "texture_staging_buffer",
                    requirements,
                    location: MemoryLocation::CpuToGpu,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|_| {
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!("battle_city::vulkan", "Out of GPU memory for staging buffer ({:.2} MB)", size_mb);
                    Error::OutOfMemory
                })?;

            ctx.device.bind_buffer_memory(staging.buffer, allocation.memory(), allocation.offset())
                .map_err(|e| engine_err!("battle_city::vulkan", "Failed to bind staging buffer memory: {:?}", e))?;

            let mapped_ptr = allocation.mapped_ptr()
                .ok_or_else(|| engine_err!("battle_city::vulkan", "Staging buffer is not mapped"))?
                .as_ptr() as *mut u8;
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped_ptr, data.len());

            staging.allocation = Some(allocation);
        }

        Ok(staging)
    }
}

impl Drop for StagingBuffer<'_> {
    fn drop(&mut self) {
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
            if self.buffer != vk::Buffer::null() {
                self.ctx.device.destroy_buffer(self.buffer, None);
            }
        }
    }
}

fn color_range(base_mip_level: u32, level_count: u32) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level,
        level_count,
        base_array_layer: 0,
        layer_count: 1,
    }
}

fn color_layers(mip_level: u32) -> vk::ImageSubresourceLayers {
    vk::ImageSubresourceLayers {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        mip_level,
        base_array_layer: 0,
        layer_count: 1,
    }
}

/// Far corner of mip level `mip`, never smaller than one texel
fn mip_corner(width: u32, height: u32, mip: u32) -> vk::Offset3D {
    vk::Offset3D {
        x: (width >> mip).max(1) as i32,
        y: (height >> mip).max(1) as i32,
        z: 1,
    }
}

unsafe fn transition(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    range: vk::ImageSubresourceRange,
    (old_layout, new_layout): (vk::ImageLayout, vk::ImageLayout),
    (src_access, dst_access): (vk::AccessFlags, vk::AccessFlags),
    (src_stage, dst_stage): (vk::PipelineStageFlags, vk::PipelineStageFlags),
) {
    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(range)
        .src_access_mask(src_access)
        .dst_access_mask(dst_access);

    device.cmd_pipeline_barrier(
        command_buffer,
        src_stage,
        dst_stage,
        vk::DependencyFlags::empty(),
        &[],
        &[],
        &[barrier],
    );
}

#[cfg(test)]
#[path = "vulkan_texture_tests.rs"]
mod tests;
