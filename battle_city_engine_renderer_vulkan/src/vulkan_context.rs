/// GpuContext - Shared GPU objects for all Vulkan resources
///
/// Textures and shader programs keep an `Arc<GpuContext>` so they can
/// release their Vulkan handles on drop without reaching back into the
/// renderer.

use ash::vk;
use battle_city_engine::battle_city::{Error, Result};
use battle_city_engine::battle_city::render::MAX_TEXTURE_UNITS;
use battle_city_engine::{engine_debug, engine_err};
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Combined image samplers per descriptor pool
const SETS_PER_POOL: u32 = 256;

/// Shared GPU context.
///
/// Device and instance destruction is handled by `VulkanRenderer::drop()`,
/// so every texture and shader program must be dropped before the renderer.
pub struct GpuContext {
    pub device: ash::Device,

    /// Wrapped in ManuallyDrop so the renderer can free it before the device
    pub allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,

    pub graphics_queue: vk::Queue,

    /// TRANSIENT + RESET_COMMAND_BUFFER pool for one-shot uploads
    pub upload_command_pool: Mutex<vk::CommandPool>,

    /// Layout of every texture set: one combined image sampler at binding 0
    pub texture_set_layout: vk::DescriptorSetLayout,

    /// Grows when the last pool is exhausted
    pub(crate) descriptor_pools: Mutex<Vec<vk::DescriptorPool>>,

    /// Bytes currently allocated for texture images
    texture_memory: AtomicU64,

    instance: ash::Instance,
    physical_device: vk::PhysicalDevice,

    pub(crate) debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    pub(crate) debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl GpuContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        instance: ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        allocator: Arc<Mutex<Allocator>>,
        graphics_queue: vk::Queue,
        upload_command_pool: vk::CommandPool,
        texture_set_layout: vk::DescriptorSetLayout,
        debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
        debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    ) -> Self {
        Self {
            device,
            allocator: ManuallyDrop::new(allocator),
            graphics_queue,
            upload_command_pool: Mutex::new(upload_command_pool),
            texture_set_layout,
            descriptor_pools: Mutex::new(Vec::new()),
            texture_memory: AtomicU64::new(0),
            instance,
            physical_device,
            debug_utils_loader,
            debug_messenger,
        }
    }

    /// Create the descriptor set layout shared by all texture units
    pub fn create_texture_set_layout(device: &ash::Device) -> Result<vk::DescriptorSetLayout> {
        let binding = vk::DescriptorSetLayoutBinding::default()
            .binding(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::FRAGMENT);

        let info = vk::DescriptorSetLayoutCreateInfo::default()
            .bindings(std::slice::from_ref(&binding));

        unsafe {
            device.create_descriptor_set_layout(&info, None)
                .map_err(|e| Error::InitializationFailed(format!(
                    "Failed to create texture descriptor set layout: {:?}", e
                )))
        }
    }

    /// The set layouts of a pipeline: the texture layout once per unit
    pub fn pipeline_set_layouts(&self) -> [vk::DescriptorSetLayout; MAX_TEXTURE_UNITS as usize] {
        [self.texture_set_layout; MAX_TEXTURE_UNITS as usize]
    }

    pub fn lock_allocator(&self) -> Result<MutexGuard<'_, Allocator>> {
        self.allocator.lock()
            .map_err(|_| engine_err!("battle_city::vulkan", "GPU allocator lock poisoned"))
    }

    /// Whether `format` can be the source of a linear blit (mipmap generation)
    pub fn supports_linear_blit(&self, format: vk::Format) -> bool {
        let properties = unsafe {
            self.instance.get_physical_device_format_properties(self.physical_device, format)
        };
        properties.optimal_tiling_features
            .contains(vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR)
    }

    pub fn texture_memory(&self) -> u64 {
        self.texture_memory.load(Ordering::Relaxed)
    }

    pub(crate) fn track_texture_memory(&self, bytes: u64) {
        self.texture_memory.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn untrack_texture_memory(&self, bytes: u64) {
        self.texture_memory.fetch_sub(bytes, Ordering::Relaxed);
    }

    /// Allocate one texture descriptor set, growing the pool list when needed
    pub fn allocate_texture_set(&self) -> Result<(vk::DescriptorPool, vk::DescriptorSet)> {
        let mut pools = self.descriptor_pools.lock()
            .map_err(|_| engine_err!("battle_city::vulkan", "Descriptor pool lock poisoned"))?;

        let layouts = [self.texture_set_layout];
        for &pool in pools.iter().rev() {
            let info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(pool)
                .set_layouts(&layouts);
            match unsafe { self.device.allocate_descriptor_sets(&info) } {
                Ok(sets) => return Ok((pool, sets[0])),
                Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY) | Err(vk::Result::ERROR_FRAGMENTED_POOL) => continue,
                Err(e) => return Err(engine_err!("battle_city::vulkan",
                    "Failed to allocate texture descriptor set: {:?}", e)),
            }
        }

        let pool = Self::create_descriptor_pool(&self.device)?;
        pools.push(pool);
        engine_debug!("battle_city::vulkan", "Created descriptor pool #{}", pools.len());

        let info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&layouts);
        let sets = unsafe { self.device.allocate_descriptor_sets(&info) }
            .map_err(|e| engine_err!("battle_city::vulkan",
                "Failed to allocate texture descriptor set: {:?}", e))?;
        Ok((pool, sets[0]))
    }

    pub fn free_texture_set(&self, pool: vk::DescriptorPool, set: vk::DescriptorSet) {
        if let Ok(_pools) = self.descriptor_pools.lock() {
            unsafe {
                self.device.free_descriptor_sets(pool, &[set]).ok();
            }
        }
    }

    fn create_descriptor_pool(device: &ash::Device) -> Result<vk::DescriptorPool> {
        let pool_sizes = [vk::DescriptorPoolSize {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: SETS_PER_POOL,
        }];
        let info = vk::DescriptorPoolCreateInfo::default()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .pool_sizes(&pool_sizes)
            .max_sets(SETS_PER_POOL);

        unsafe {
            device.create_descriptor_pool(&info, None)
                .map_err(|e| engine_err!("battle_city::vulkan", "Failed to create descriptor pool: {:?}", e))
        }
    }

    /// Record commands into a one-shot command buffer and wait for them
    pub fn submit_one_shot<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(vk::CommandBuffer),
    {
        let pool = self.upload_command_pool.lock()
            .map_err(|_| engine_err!("battle_city::vulkan", "Upload command pool lock poisoned"))?;

        unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffers = self.device.allocate_command_buffers(&allocate_info)
                .map_err(|e| engine_err!("battle_city::vulkan", "Failed to allocate upload command buffer: {:?}", e))?;
            let command_buffer = command_buffers[0];

            let result = (|| {
                let begin_info = vk::CommandBufferBeginInfo::default()
                    .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
                self.device.begin_command_buffer(command_buffer, &begin_info)
                    .map_err(|e| engine_err!("battle_city::vulkan", "Failed to begin upload command buffer: {:?}", e))?;

                record(command_buffer);

                self.device.end_command_buffer(command_buffer)
                    .map_err(|e| engine_err!("battle_city::vulkan", "Failed to end upload command buffer: {:?}", e))?;

                let submit_info = vk::SubmitInfo::default()
                    .command_buffers(&command_buffers);
                self.device.queue_submit(self.graphics_queue, &[submit_info], vk::Fence::null())
                    .map_err(|e| engine_err!("battle_city::vulkan", "Failed to submit upload: {:?}", e))?;

                self.device.queue_wait_idle(self.graphics_queue)
                    .map_err(|e| engine_err!("battle_city::vulkan", "Failed to wait for upload: {:?}", e))
            })();

            self.device.free_command_buffers(*pool, &command_buffers);
            result
        }
    }
}
