/// Winit application handler and render loop
///
/// The handler only translates window events into the `EventQueue`. Each
/// redraw drains the queue, applies resizes, then clears the screen and
/// draws every sprite.

use std::sync::{Arc, Mutex, MutexGuard};
use battle_city_engine::battle_city::{Engine, Error, Renderer, Result};
use battle_city_engine::battle_city::platform::{EventQueue, Key, PlatformEvent, WindowContext};
use battle_city_engine::battle_city::resource::ResourceManager;
use battle_city_engine::{engine_debug, engine_error, engine_info, engine_warn};
use battle_city_engine_renderer_vulkan::{validation_message_counts, VulkanRenderer};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowId};
use crate::config::{AssetsConfig, GameConfig};

const SOURCE: &str = "battle_city";

/// Outcome of one drain of the event queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopControl {
    pub exit: bool,
    /// Last framebuffer size reported, zero included
    pub resize: Option<(u32, u32)>,
    /// The window context changed and the projection must be rebuilt
    pub projection_changed: bool,
}

/// Apply queued events to the window context, oldest first
pub fn process_events(events: Vec<PlatformEvent>, window_context: &mut WindowContext) -> LoopControl {
    let mut control = LoopControl::default();
    for event in events {
        match event {
            PlatformEvent::CloseRequested | PlatformEvent::KeyPressed(Key::Escape) => {
                control.exit = true;
            }
            PlatformEvent::Resized { width, height } => {
                control.resize = Some((width, height));
                if window_context.resize(width, height) {
                    control.projection_changed = true;
                }
            }
            PlatformEvent::KeyPressed(key) => {
                engine_debug!(SOURCE, "Key pressed: {:?}", key);
            }
        }
    }
    control
}

/// Load the startup shader, texture and sprite and set the shader's uniforms
pub fn load_assets(
    resources: &mut ResourceManager,
    assets: &AssetsConfig,
    window_context: &WindowContext,
) -> Result<()> {
    resources.load_shaders(&assets.shader_name, &assets.vertex_shader_path, &assets.fragment_shader_path)?;
    resources.load_texture(&assets.texture_name, &assets.texture_path)?;

    let (width, height) = assets.sprite_size;
    resources.load_sprite(&assets.sprite_name, &assets.texture_name, &assets.shader_name, width, height)?;

    let program = resources.shader_program_mut(&assets.shader_name)?;
    program.set_int(&assets.sampler_uniform, 0);
    program.set_matrix4(&assets.projection_uniform, window_context.projection_matrix());

    resources.sprite_mut(&assets.sprite_name)?.set_position(assets.sprite_position);
    Ok(())
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| Error::BackendError("Lock poisoned".to_string()))
}

/// Everything that lives between window creation and exit.
/// Fields drop in order: the resources and renderer go before the window.
struct Game {
    resources: Arc<Mutex<ResourceManager>>,
    renderer: Arc<Mutex<dyn Renderer>>,
    window_context: WindowContext,
    events: EventQueue,
    window: Window,
}

impl Game {
    fn start(event_loop: &ActiveEventLoop, config: &GameConfig) -> Result<Self> {
        let attributes = config.window.window_attributes(event_loop.primary_monitor());
        let window = event_loop.create_window(attributes)
            .map_err(|e| Error::InitializationFailed(format!("Failed to create window: {}", e)))?;
        let size = window.inner_size();
        engine_info!(SOURCE, "Window created: {}x{}", size.width, size.height);

        let window_context = WindowContext::new(size.width, size.height);
        let (renderer, resources) = match Self::create_engine(&window, config, &window_context) {
            Ok(engine) => engine,
            Err(error) => {
                // Release the surface while the window still exists
                Engine::shutdown();
                return Err(error);
            }
        };

        Ok(Self {
            resources,
            renderer,
            window_context,
            events: EventQueue::new(),
            window,
        })
    }

    fn create_engine(
        window: &Window,
        config: &GameConfig,
        window_context: &WindowContext,
    ) -> Result<(Arc<Mutex<dyn Renderer>>, Arc<Mutex<ResourceManager>>)> {
        let mut backend = VulkanRenderer::new(window, config.renderer.clone())?;
        backend.set_clear_color(config.clear_color);

        Engine::initialize()?;
        let renderer = Engine::create_renderer(backend)?;
        let executable_path = std::env::current_exe()
            .map_err(|e| Error::FileReadFailed(format!("Cannot locate executable: {}", e)))?;
        let resources = Engine::create_resource_manager(&executable_path)?;

        load_assets(&mut *lock(&resources)?, &config.assets, window_context)?;
        Ok((renderer, resources))
    }

    /// Run one loop iteration. Returns false when the game should exit.
    fn frame(&mut self, assets: &AssetsConfig) -> Result<bool> {
        let control = process_events(self.events.drain(), &mut self.window_context);
        if control.exit {
            return Ok(false);
        }
        if let Some((width, height)) = control.resize {
            lock(&self.renderer)?.resize(width, height);
        }
        if control.projection_changed {
            let projection = self.window_context.projection_matrix();
            lock(&self.resources)?
                .shader_program_mut(&assets.shader_name)?
                .set_matrix4(&assets.projection_uniform, projection);
            engine_debug!(SOURCE, "Resized to {}x{}", self.window_context.width(), self.window_context.height());
        }

        let frame = lock(&self.renderer)?.begin_frame()?;
        let Some(frame) = frame else {
            return Ok(true);
        };
        lock(&self.resources)?.render_all_sprites(&*frame)?;
        lock(&self.renderer)?.end_frame(frame)?;
        Ok(true)
    }
}

pub struct App {
    config: GameConfig,
    game: Option<Game>,
    error: Option<Error>,
}

impl App {
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            game: None,
            error: None,
        }
    }

    /// Error that stopped the game, if any
    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: Error) {
        engine_error!(SOURCE, "{}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    /// Release GPU resources while the window still exists. Idempotent.
    pub fn shutdown(&mut self) {
        let Some(game) = self.game.take() else {
            return;
        };
        match lock(&game.renderer) {
            Ok(renderer) => {
                if let Err(error) = renderer.wait_idle() {
                    engine_warn!(SOURCE, "wait_idle failed during shutdown: {}", error);
                }
            }
            Err(error) => engine_warn!(SOURCE, "{}", error),
        }
        Engine::shutdown();
        drop(game);

        let (errors, warnings) = validation_message_counts();
        engine_info!(SOURCE, "Validation messages: {} errors, {} warnings", errors, warnings);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.game.is_some() || self.error.is_some() {
            return;
        }
        match Game::start(event_loop, &self.config) {
            Ok(game) => self.game = Some(game),
            Err(error) => self.fail(event_loop, error),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(game) = &self.game {
            game.window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(game) = self.game.as_mut() else {
            return;
        };

        if let Some(platform_event) = PlatformEvent::from_window_event(&event) {
            game.events.push(platform_event);
        }

        if matches!(event, WindowEvent::RedrawRequested | WindowEvent::CloseRequested) {
            match game.frame(&self.config.assets) {
                Ok(true) => {}
                Ok(false) => {
                    engine_info!(SOURCE, "Exit requested");
                    event_loop.exit();
                }
                Err(error) => self.fail(event_loop, error),
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
