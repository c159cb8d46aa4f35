/// SamplerCache - internal VkSampler management for the Vulkan backend
///
/// One sampler per (filter, wrap) pair, created on first use and shared by
/// every texture with the same parameters.

use battle_city_engine::battle_city::Result;
use battle_city_engine::battle_city::render::{FilterMode, WrapMode};
use battle_city_engine::engine_err;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{filter_to_vk, mipmap_mode_to_vk, wrap_to_vk};
use ash::vk;
use rustc_hash::FxHashMap;
use std::sync::Arc;

pub(crate) struct SamplerCache {
    ctx: Option<Arc<GpuContext>>,
    cache: FxHashMap<(FilterMode, WrapMode), vk::Sampler>,
}

impl SamplerCache {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Self {
        Self {
            ctx: Some(ctx),
            cache: FxHashMap::default(),
        }
    }

    /// Get or create the sampler for `filter` and `wrap`
    pub(crate) fn get(&mut self, filter: FilterMode, wrap: WrapMode) -> Result<vk::Sampler> {
        if let Some(&sampler) = self.cache.get(&(filter, wrap)) {
            return Ok(sampler);
        }

        let ctx = self.ctx.as_ref()
            .ok_or_else(|| engine_err!("battle_city::vulkan", "Sampler cache used after shutdown"))?;

        let address = wrap_to_vk(wrap);
        let create_info = vk::SamplerCreateInfo::default()
            .mag_filter(filter_to_vk(filter))
            .min_filter(filter_to_vk(filter))
            .mipmap_mode(mipmap_mode_to_vk(filter))
            .address_mode_u(address)
            .address_mode_v(address)
            .address_mode_w(address)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(vk::LOD_CLAMP_NONE)
            .anisotropy_enable(false)
            .max_anisotropy(1.0)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .border_color(vk::BorderColor::FLOAT_OPAQUE_BLACK)
            .unnormalized_coordinates(false);

        let sampler = unsafe {
            ctx.device.create_sampler(&create_info, None)
                .map_err(|e| engine_err!("battle_city::vulkan",
                    "Failed to create sampler ({:?}, {:?}): {:?}", filter, wrap, e))?
        };
        self.cache.insert((filter, wrap), sampler);
        Ok(sampler)
    }

    pub(crate) fn len(&self) -> usize {
        self.cache.len()
    }

    /// Destroy all cached samplers and release the GpuContext reference.
    /// Must run while the device is still alive.
    pub(crate) fn shutdown(&mut self) {
        if let Some(ctx) = &self.ctx {
            for (_, sampler) in self.cache.drain() {
                unsafe { ctx.device.destroy_sampler(sampler, None); }
            }
        }
        self.ctx = None;
    }
}

impl Drop for SamplerCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}
