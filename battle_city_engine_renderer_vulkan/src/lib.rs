/*!
# Battle City Engine - Vulkan Renderer Backend

Vulkan implementation of the Battle City renderer traits, using Ash for the
Vulkan bindings, gpu-allocator for memory and spirq for shader reflection.

```no_run
use battle_city_engine::battle_city::{Engine, render::Config};
use battle_city_engine_renderer_vulkan::VulkanRenderer;
# fn run(window: &winit::window::Window) -> battle_city_engine::battle_city::Result<()> {
let renderer = VulkanRenderer::new(window, Config::default())?;
Engine::create_renderer(renderer)?;
# Ok(())
# }
```
*/

mod debug;
mod vulkan_context;
mod vulkan_format;
mod vulkan_frame;
mod vulkan_renderer;
mod vulkan_sampler;
mod vulkan_shader_program;
mod vulkan_texture;

pub use vulkan_renderer::VulkanRenderer;
pub use debug::validation_message_counts;
