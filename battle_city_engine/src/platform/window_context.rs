/// Window settings and the live framebuffer size.
///
/// `WindowContext` replaces any global window-size state: the render loop
/// owns one, updates it from resize events and derives the projection from it.

use glam::Mat4;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::monitor::MonitorHandle;
use winit::window::{Fullscreen, WindowAttributes};

/// Depth range of the 2D orthographic projection
pub const NEAR_PLANE: f32 = -100.0;
pub const FAR_PLANE: f32 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Borderless fullscreen on the primary monitor, sized to its video mode
    pub fullscreen: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Battle City".to_string(),
            width: 640,
            height: 480,
            fullscreen: true,
        }
    }
}

impl WindowConfig {
    /// Window size to request, given the primary monitor's size if known
    pub fn effective_size(&self, monitor_size: Option<(u32, u32)>) -> (u32, u32) {
        match monitor_size {
            Some((w, h)) if self.fullscreen && w > 0 && h > 0 => (w, h),
            _ => (self.width, self.height),
        }
    }

    /// Build winit attributes for this configuration
    pub fn window_attributes(&self, primary_monitor: Option<MonitorHandle>) -> WindowAttributes {
        let attributes = WindowAttributes::default().with_title(&self.title);

        if !self.fullscreen {
            return attributes.with_inner_size(LogicalSize::new(self.width, self.height));
        }

        let monitor_size = primary_monitor.as_ref().map(|m| {
            let size = m.size();
            (size.width, size.height)
        });
        let (width, height) = self.effective_size(monitor_size);
        attributes
            .with_inner_size(PhysicalSize::new(width, height))
            .with_fullscreen(Some(Fullscreen::Borderless(primary_monitor)))
    }
}

/// Current framebuffer size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowContext {
    width: u32,
    height: u32,
}

impl WindowContext {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Minimized windows report a zero size
    pub fn is_minimized(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Record a new framebuffer size
    ///
    /// Zero sizes are ignored. Returns true if the size changed.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 || (width, height) == (self.width, self.height) {
            return false;
        }
        self.width = width;
        self.height = height;
        true
    }

    /// Pixel-space orthographic projection with the origin at the bottom-left
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::orthographic_rh(0.0, self.width as f32, 0.0, self.height as f32, NEAR_PLANE, FAR_PLANE)
    }
}

#[cfg(test)]
#[path = "window_context_tests.rs"]
mod tests;
