/*!
# Battle City Engine

Core types for the Battle City 2D renderer.

The crate is platform-agnostic: graphics backends implement the renderer
traits and are handed to the engine at startup.

## Architecture

- **Renderer**: Factory trait for GPU textures and shader programs, plus frame control
- **RendererFrame**: Commands recorded into the current frame
- **ResourceManager**: Named shader programs, textures and sprites
- **WindowContext** / **EventQueue**: Framebuffer size and per-frame platform events
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod renderer;
pub mod resource;
pub mod platform;

// Main battle_city namespace module
pub mod battle_city {
    pub use crate::error::{Error, Result};

    pub use crate::engine::Engine;

    pub use crate::renderer::Renderer;

    // Logging types; the engine_* macros are exported at the crate root
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    pub mod render {
        pub use crate::renderer::*;
    }

    pub mod resource {
        pub use crate::resource::*;
    }

    pub mod platform {
        pub use crate::platform::*;
    }
}

// Re-export math library at crate root
pub use glam;
