//! Platform module
//!
//! Window configuration, the current framebuffer size and the per-frame
//! event queue fed by winit.

pub mod window_context;
pub mod event_queue;

pub use window_context::{WindowConfig, WindowContext, NEAR_PLANE, FAR_PLANE};
pub use event_queue::{EventQueue, Key, PlatformEvent};
