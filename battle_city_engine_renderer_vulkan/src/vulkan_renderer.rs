/// VulkanRenderer - Vulkan implementation of the Renderer trait
///
/// Owns the instance, device, surface and swapchain, creates textures and
/// shader programs, and records one command buffer per frame in flight.

use ash::vk;
use battle_city_engine::battle_city::{Error, Renderer, Result};
use battle_city_engine::battle_city::render::{
    Config, RendererFrame, RendererShaderProgram, RendererStats, RendererTexture,
    ShaderProgramDesc, TextureDesc,
};
use battle_city_engine::{engine_debug, engine_err, engine_error, engine_info, engine_warn};
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};
use winit::window::Window;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    choose_extent, choose_image_count, choose_surface_format, clear_color_for_format, flipped_viewport,
};
use crate::vulkan_frame::Frame;
use crate::vulkan_sampler::SamplerCache;
use crate::vulkan_shader_program::ShaderProgram;
use crate::vulkan_texture::Texture;

const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Swapchain and the per-image objects rebuilt with it
struct SwapchainResources {
    swapchain: vk::SwapchainKHR,
    image_views: Vec<vk::ImageView>,
    framebuffers: Vec<vk::Framebuffer>,
    /// Signalled when rendering to image `i` is finished
    render_finished: Vec<vk::Semaphore>,
    extent: vk::Extent2D,
}

impl SwapchainResources {
    fn empty() -> Self {
        Self {
            swapchain: vk::SwapchainKHR::null(),
            image_views: Vec::new(),
            framebuffers: Vec::new(),
            render_finished: Vec::new(),
            extent: vk::Extent2D::default(),
        }
    }

    /// Destroy everything but the swapchain handle, which may be reused as `old_swapchain`
    unsafe fn destroy_views(&mut self, device: &ash::Device) {
        for framebuffer in self.framebuffers.drain(..) {
            device.destroy_framebuffer(framebuffer, None);
        }
        for view in self.image_views.drain(..) {
            device.destroy_image_view(view, None);
        }
        for semaphore in self.render_finished.drain(..) {
            device.destroy_semaphore(semaphore, None);
        }
    }
}

/// Vulkan renderer implementation
pub struct VulkanRenderer {
    _entry: ash::Entry,
    instance: ash::Instance,
    physical_device: vk::PhysicalDevice,
    device: ash::Device,

    graphics_queue: vk::Queue,
    present_queue: vk::Queue,

    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
    swapchain_loader: ash::khr::swapchain::Device,
    surface_format: vk::SurfaceFormatKHR,
    swapchain: SwapchainResources,

    render_pass: vk::RenderPass,

    // Synchronization
    image_available_semaphores: Vec<vk::Semaphore>,
    in_flight_fences: Vec<vk::Fence>,
    current_frame: usize,

    // Command buffers (one per frame in flight)
    command_pool: vk::CommandPool,
    command_buffers: Vec<vk::CommandBuffer>,

    sampler_cache: SamplerCache,
    gpu_context: Arc<GpuContext>,

    clear_color: [f32; 4],
    stats: RendererStats,

    // Window state
    window_width: u32,
    window_height: u32,
    framebuffer_resized: bool,
}

impl VulkanRenderer {
    /// Create a renderer presenting to `window`
    pub fn new(window: &Window, config: Config) -> Result<Self> {
        let size = window.inner_size();
        Self::with_surface(window, size.width, size.height, config)
    }

    /// Create a renderer for any window handle of the given framebuffer size
    pub fn with_surface<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        width: u32,
        height: u32,
        config: Config,
    ) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| {
                    engine_error!("battle_city::vulkan", "Failed to load Vulkan library: {:?}", e);
                    Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
                })?;

            let app_name = CString::new(config.app_name.as_str())
                .map_err(|e| Error::InitializationFailed(format!("Invalid app name: {}", e)))?;

            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(
                    0,
                    config.app_version.0,
                    config.app_version.1,
                    config.app_version.2,
                ))
                .engine_name(c"BattleCity")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::make_api_version(0, config.api_version.0, config.api_version.1, 0));

            let display_handle = window.display_handle()
                .map_err(|e| {
                    engine_error!("battle_city::vulkan", "Failed to get display handle: {}", e);
                    Error::InitializationFailed(format!("Failed to get display handle: {}", e))
                })?;
            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| {
                    engine_error!("battle_city::vulkan", "Failed to get required extensions: {}", e);
                    Error::InitializationFailed(format!("Failed to get required extensions: {}", e))
                })?
                .to_vec();

            let enable_validation = config.enable_validation && Self::validation_layer_available(&entry);
            if config.enable_validation && !enable_validation {
                engine_warn!("battle_city::vulkan", "VK_LAYER_KHRONOS_validation not installed, validation disabled");
            }
            if enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            let layer_names = if enable_validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| {
                    engine_error!("battle_city::vulkan", "Failed to create Vulkan instance: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
                })?;

            let (debug_utils_loader, debug_messenger) = if enable_validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
                let messenger = debug_utils
                    .create_debug_utils_messenger(&crate::debug::messenger_create_info(), None)
                    .map_err(|e| {
                        engine_error!("battle_city::vulkan", "Failed to create debug messenger: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
                    })?;
                (Some(debug_utils), Some(messenger))
            } else {
                (None, None)
            };

            let window_handle = window.window_handle()
                .map_err(|e| {
                    engine_error!("battle_city::vulkan", "Failed to get window handle: {}", e);
                    Error::InitializationFailed(format!("Failed to get window handle: {}", e))
                })?;
            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                engine_error!("battle_city::vulkan", "Failed to create surface: {:?}", e);
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?;

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            let (physical_device, graphics_family_index, present_family_index) =
                Self::pick_physical_device(&instance, &surface_loader, surface)?;

            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = properties.device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string());
            engine_info!("battle_city::vulkan", "Renderer: {}", device_name);
            engine_info!("battle_city::vulkan", "Vulkan version: {}.{}.{}",
                vk::api_version_major(properties.api_version),
                vk::api_version_minor(properties.api_version),
                vk::api_version_patch(properties.api_version));

            // Logical device
            let queue_priorities = [1.0];
            let mut queue_create_infos = vec![
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(graphics_family_index)
                    .queue_priorities(&queue_priorities),
            ];
            if graphics_family_index != present_family_index {
                queue_create_infos.push(
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(present_family_index)
                        .queue_priorities(&queue_priorities),
                );
            }

            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
            let device_features = vk::PhysicalDeviceFeatures::default();

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&device_features);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    engine_error!("battle_city::vulkan", "Failed to create logical device: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;

            let graphics_queue = device.get_device_queue(graphics_family_index, 0);
            let present_queue = device.get_device_queue(present_family_index, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                engine_error!("battle_city::vulkan", "Failed to create GPU allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            let surface_formats = surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .map_err(|e| Error::InitializationFailed(format!("Failed to get surface formats: {:?}", e)))?;
            let surface_format = choose_surface_format(&surface_formats)
                .ok_or_else(|| Error::InitializationFailed("Surface reports no formats".to_string()))?;

            // Synchronization
            let semaphore_create_info = vk::SemaphoreCreateInfo::default();
            let fence_create_info = vk::FenceCreateInfo::default()
                .flags(vk::FenceCreateFlags::SIGNALED);

            let mut image_available_semaphores = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
            let mut in_flight_fences = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
            for _ in 0..MAX_FRAMES_IN_FLIGHT {
                image_available_semaphores.push(
                    device.create_semaphore(&semaphore_create_info, None)
                        .map_err(|e| Error::InitializationFailed(format!("Failed to create semaphore: {:?}", e)))?
                );
                in_flight_fences.push(
                    device.create_fence(&fence_create_info, None)
                        .map_err(|e| Error::InitializationFailed(format!("Failed to create fence: {:?}", e)))?
                );
            }

            let command_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(graphics_family_index)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let command_pool = device.create_command_pool(&command_pool_create_info, None)
                .map_err(|e| Error::InitializationFailed(format!("Failed to create command pool: {:?}", e)))?;

            let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(MAX_FRAMES_IN_FLIGHT as u32);
            let command_buffers = device.allocate_command_buffers(&command_buffer_allocate_info)
                .map_err(|e| Error::InitializationFailed(format!("Failed to allocate command buffers: {:?}", e)))?;

            let upload_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(graphics_family_index)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let upload_command_pool = device.create_command_pool(&upload_pool_create_info, None)
                .map_err(|e| Error::InitializationFailed(format!("Failed to create upload command pool: {:?}", e)))?;

            let render_pass = Self::create_render_pass(&device, surface_format.format)?;
            let texture_set_layout = GpuContext::create_texture_set_layout(&device)?;

            let gpu_context = Arc::new(GpuContext::new(
                instance.clone(),
                physical_device,
                device.clone(),
                Arc::new(Mutex::new(allocator)),
                graphics_queue,
                upload_command_pool,
                texture_set_layout,
                debug_utils_loader,
                debug_messenger,
            ));

            let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);

            let mut renderer = Self {
                _entry: entry,
                instance,
                physical_device,
                device,
                graphics_queue,
                present_queue,
                surface,
                surface_loader,
                swapchain_loader,
                surface_format,
                swapchain: SwapchainResources::empty(),
                render_pass,
                image_available_semaphores,
                in_flight_fences,
                current_frame: 0,
                command_pool,
                command_buffers,
                sampler_cache: SamplerCache::new(Arc::clone(&gpu_context)),
                gpu_context,
                clear_color: [0.0, 0.0, 0.0, 1.0],
                stats: RendererStats::default(),
                window_width: width,
                window_height: height,
                framebuffer_resized: false,
            };

            renderer.recreate_swapchain()?;

            engine_info!("battle_city::vulkan", "Vulkan renderer ready ({}x{}, {:?}, validation {})",
                renderer.swapchain.extent.width, renderer.swapchain.extent.height,
                surface_format.format, if enable_validation { "on" } else { "off" });

            Ok(renderer)
        }
    }

    /// Current swapchain extent (zero until the first non-empty size)
    pub fn extent(&self) -> (u32, u32) {
        (self.swapchain.extent.width, self.swapchain.extent.height)
    }

    fn validation_layer_available(entry: &ash::Entry) -> bool {
        unsafe { entry.enumerate_instance_layer_properties() }
            .map(|layers| {
                layers.iter().any(|layer| {
                    layer.layer_name_as_c_str()
                        .map(|name| name == c"VK_LAYER_KHRONOS_validation")
                        .unwrap_or(false)
                })
            })
            .unwrap_or(false)
    }

    /// First GPU with a graphics queue and a queue that can present to `surface`
    unsafe fn pick_physical_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<(vk::PhysicalDevice, u32, u32)> {
        let physical_devices = instance
            .enumerate_physical_devices()
            .map_err(|e| {
                engine_error!("battle_city::vulkan", "Failed to enumerate physical devices: {:?}", e);
                Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
            })?;

        for physical_device in physical_devices {
            let queue_families = instance.get_physical_device_queue_family_properties(physical_device);

            let graphics = queue_families
                .iter()
                .position(|qf| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                .map(|i| i as u32);

            let present = (0..queue_families.len() as u32).find(|&i| {
                surface_loader
                    .get_physical_device_surface_support(physical_device, i, surface)
                    .unwrap_or(false)
            });

            if let (Some(graphics), Some(present)) = (graphics, present) {
                return Ok((physical_device, graphics, present));
            }
        }

        engine_error!("battle_city::vulkan", "No Vulkan-capable GPU can present to this window");
        Err(Error::InitializationFailed("No Vulkan-capable GPU found".to_string()))
    }

    unsafe fn create_render_pass(device: &ash::Device, format: vk::Format) -> Result<vk::RenderPass> {
        let color_attachment = vk::AttachmentDescription::default()
            .format(format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR);

        let color_attachment_ref = vk::AttachmentReference::default()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

        let subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(std::slice::from_ref(&color_attachment_ref));

        let dependency = vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE);

        let render_pass_info = vk::RenderPassCreateInfo::default()
            .attachments(std::slice::from_ref(&color_attachment))
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(std::slice::from_ref(&dependency));

        device.create_render_pass(&render_pass_info, None)
            .map_err(|e| Error::InitializationFailed(format!("Failed to create render pass: {:?}", e)))
    }

    /// Rebuild the swapchain for the current window size.
    ///
    /// Leaves the extent at zero when the surface has no area (minimized).
    unsafe fn recreate_swapchain(&mut self) -> Result<()> {
        self.device.device_wait_idle()
            .map_err(|e| engine_err!("battle_city::vulkan", "Failed to wait idle: {:?}", e))?;

        self.swapchain.destroy_views(&self.device);

        if self.window_width == 0 || self.window_height == 0 {
            self.swapchain.extent = vk::Extent2D::default();
            return Ok(());
        }

        let capabilities = self.surface_loader
            .get_physical_device_surface_capabilities(self.physical_device, self.surface)
            .map_err(|e| engine_err!("battle_city::vulkan", "Failed to get surface capabilities: {:?}", e))?;

        let extent = choose_extent(&capabilities, self.window_width, self.window_height);
        if extent.width == 0 || extent.height == 0 {
            self.swapchain.extent = vk::Extent2D::default();
            return Ok(());
        }

        let old_swapchain = self.swapchain.swapchain;
        let swapchain_create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.surface)
            .min_image_count(choose_image_count(&capabilities))
            .image_format(self.surface_format.format)
            .image_color_space(self.surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(vk::PresentModeKHR::FIFO)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = self.swapchain_loader
            .create_swapchain(&swapchain_create_info, None)
            .map_err(|e| engine_err!("battle_city::vulkan", "Failed to create swapchain: {:?}", e))?;

        if old_swapchain != vk::SwapchainKHR::null() {
            self.swapchain_loader.destroy_swapchain(old_swapchain, None);
        }
        self.swapchain.swapchain = swapchain;
        self.swapchain.extent = extent;

        let images = self.swapchain_loader
            .get_swapchain_images(swapchain)
            .map_err(|e| engine_err!("battle_city::vulkan", "Failed to get swapchain images: {:?}", e))?;

        for &image in &images {
            let create_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(self.surface_format.format)
                .components(vk::ComponentMapping::default())
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });

            let image_view = self.device.create_image_view(&create_info, None)
                .map_err(|e| engine_err!("battle_city::vulkan", "Failed to create swapchain image view: {:?}", e))?;
            self.swapchain.image_views.push(image_view);

            let attachments = [image_view];
            let framebuffer_info = vk::FramebufferCreateInfo::default()
                .render_pass(self.render_pass)
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);

            let framebuffer = self.device.create_framebuffer(&framebuffer_info, None)
                .map_err(|e| engine_err!("battle_city::vulkan", "Failed to create framebuffer: {:?}", e))?;
            self.swapchain.framebuffers.push(framebuffer);

            let semaphore = self.device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                .map_err(|e| engine_err!("battle_city::vulkan", "Failed to create semaphore: {:?}", e))?;
            self.swapchain.render_finished.push(semaphore);
        }

        engine_debug!("battle_city::vulkan", "Swapchain ready: {}x{}, {} images",
            extent.width, extent.height, images.len());
        Ok(())
    }
}

impl Renderer for VulkanRenderer {
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn RendererTexture>> {
        let sampler = self.sampler_cache.get(desc.filter, desc.wrap)?;
        let texture = Texture::create(&self.gpu_context, &desc, sampler)?;
        engine_debug!("battle_city::vulkan", "Created texture {}x{} ({} mip levels, {} samplers cached)",
            desc.width, desc.height, texture.info().mip_levels, self.sampler_cache.len());
        Ok(Arc::new(texture))
    }

    fn create_shader_program(&mut self, desc: ShaderProgramDesc) -> Result<Arc<dyn RendererShaderProgram>> {
        let program = ShaderProgram::create(&self.gpu_context, self.render_pass, &desc)?;
        Ok(Arc::new(program))
    }

    fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    fn begin_frame(&mut self) -> Result<Option<Arc<dyn RendererFrame>>> {
        unsafe {
            if self.framebuffer_resized {
                self.framebuffer_resized = false;
                self.recreate_swapchain()?;
            }

            // Minimized: nothing to draw into
            if self.swapchain.extent.width == 0 || self.swapchain.extent.height == 0 {
                return Ok(None);
            }

            let fence = self.in_flight_fences[self.current_frame];
            self.device
                .wait_for_fences(&[fence], true, u64::MAX)
                .map_err(|e| engine_err!("battle_city::vulkan", "Failed to wait for fence: {:?}", e))?;

            let (image_index, _is_suboptimal) = match self
                .swapchain_loader
                .acquire_next_image(
                    self.swapchain.swapchain,
                    u64::MAX,
                    self.image_available_semaphores[self.current_frame],
                    vk::Fence::null(),
                ) {
                    Ok(result) => result,
                    Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                        self.framebuffer_resized = true;
                        return Ok(None);
                    }
                    Err(e) => return Err(engine_err!("battle_city::vulkan", "Failed to acquire next image: {:?}", e)),
                };

            // Only reset once work is guaranteed to be submitted with it
            self.device
                .reset_fences(&[fence])
                .map_err(|e| engine_err!("battle_city::vulkan", "Failed to reset fence: {:?}", e))?;

            let command_buffer = self.command_buffers[self.current_frame];
            self.device
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| engine_err!("battle_city::vulkan", "Failed to reset command buffer: {:?}", e))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| engine_err!("battle_city::vulkan", "Failed to begin command buffer: {:?}", e))?;

            let clear_values = [vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: clear_color_for_format(self.clear_color, self.surface_format.format),
                },
            }];

            let render_pass_info = vk::RenderPassBeginInfo::default()
                .render_pass(self.render_pass)
                .framebuffer(self.swapchain.framebuffers[image_index as usize])
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent: self.swapchain.extent,
                })
                .clear_values(&clear_values);

            self.device.cmd_begin_render_pass(command_buffer, &render_pass_info, vk::SubpassContents::INLINE);

            self.device.cmd_set_viewport(command_buffer, 0, &[flipped_viewport(self.swapchain.extent)]);

            let scissor = vk::Rect2D::default()
                .offset(vk::Offset2D { x: 0, y: 0 })
                .extent(self.swapchain.extent);
            self.device.cmd_set_scissor(command_buffer, 0, &[scissor]);

            Ok(Some(Arc::new(Frame::new(self.device.clone(), command_buffer, image_index))))
        }
    }

    fn end_frame(&mut self, frame: Arc<dyn RendererFrame>) -> Result<()> {
        unsafe {
            // Downcast to the Vulkan frame
            let vulkan_frame = frame.as_ref() as *const dyn RendererFrame as *const Frame;
            let vulkan_frame = &*vulkan_frame;

            let command_buffer = vulkan_frame.command_buffer;
            let image_index = vulkan_frame.image_index;

            self.device.cmd_end_render_pass(command_buffer);
            self.device
                .end_command_buffer(command_buffer)
                .map_err(|e| engine_err!("battle_city::vulkan", "Failed to end command buffer: {:?}", e))?;

            let wait_semaphores = [self.image_available_semaphores[self.current_frame]];
            let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
            let signal_semaphores = [self.swapchain.render_finished[image_index as usize]];
            let command_buffers = [command_buffer];

            let submit_info = vk::SubmitInfo::default()
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages)
                .command_buffers(&command_buffers)
                .signal_semaphores(&signal_semaphores);

            self.device
                .queue_submit(self.graphics_queue, &[submit_info], self.in_flight_fences[self.current_frame])
                .map_err(|e| engine_err!("battle_city::vulkan", "Failed to submit queue: {:?}", e))?;

            {
                let state = vulkan_frame.lock_state()?;
                self.stats.draw_calls = state.draw_calls;
                self.stats.triangles = state.triangles;
            }
            self.stats.gpu_memory_used = self.gpu_context.texture_memory();

            let swapchains = [self.swapchain.swapchain];
            let image_indices = [image_index];
            let present_info = vk::PresentInfoKHR::default()
                .wait_semaphores(&signal_semaphores)
                .swapchains(&swapchains)
                .image_indices(&image_indices);

            self.current_frame = (self.current_frame + 1) % MAX_FRAMES_IN_FLIGHT;

            match self.swapchain_loader.queue_present(self.present_queue, &present_info) {
                Ok(false) => Ok(()),
                Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    self.framebuffer_resized = true;
                    Ok(())
                }
                Err(e) => Err(engine_err!("battle_city::vulkan", "Failed to present: {:?}", e)),
            }
        }
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device
                .device_wait_idle()
                .map_err(|e| engine_err!("battle_city::vulkan", "Failed to wait idle: {:?}", e))
        }
    }

    fn stats(&self) -> RendererStats {
        self.stats
    }

    fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != (self.window_width, self.window_height) {
            self.window_width = width;
            self.window_height = height;
            self.framebuffer_resized = true;
        }
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // 1. Samplers, while the device is alive; releases the cache's GpuContext Arc
            self.sampler_cache.shutdown();

            // 2. Frame objects
            for &semaphore in &self.image_available_semaphores {
                self.device.destroy_semaphore(semaphore, None);
            }
            for &fence in &self.in_flight_fences {
                self.device.destroy_fence(fence, None);
            }
            self.device.destroy_command_pool(self.command_pool, None);

            // 3. Swapchain, render pass and surface
            self.swapchain.destroy_views(&self.device);
            if self.swapchain.swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(self.swapchain.swapchain, None);
            }
            self.device.destroy_render_pass(self.render_pass, None);
            self.surface_loader.destroy_surface(self.surface, None);

            // 4. Objects shared through GpuContext
            if let Ok(pools) = self.gpu_context.descriptor_pools.lock() {
                for &pool in pools.iter() {
                    self.device.destroy_descriptor_pool(pool, None);
                }
            }
            self.device.destroy_descriptor_set_layout(self.gpu_context.texture_set_layout, None);
            if let Ok(mut pool) = self.gpu_context.upload_command_pool.lock() {
                if *pool != vk::CommandPool::null() {
                    self.device.destroy_command_pool(*pool, None);
                    *pool = vk::CommandPool::null();
                }
            }

            // 5. Allocator: free device memory BEFORE destroying the device
            match Arc::get_mut(&mut self.gpu_context) {
                Some(ctx) => ManuallyDrop::drop(&mut ctx.allocator),
                None => engine_warn!("battle_city::vulkan",
                    "Textures or shader programs outlive the renderer, GPU memory is leaked"),
            }

            // 6. Debug messenger BEFORE device and instance
            if let (Some(debug_utils), Some(messenger)) = (
                &self.gpu_context.debug_utils_loader,
                &self.gpu_context.debug_messenger,
            ) {
                debug_utils.destroy_debug_utils_messenger(*messenger, None);
            }

            // 7. Device and instance
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}
