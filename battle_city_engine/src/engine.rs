/// Battle City Engine - Singleton manager for engine subsystems
///
/// Holds the renderer and the resource manager for the lifetime of the
/// program, plus the global logger. Thread-safe static storage guarded by
/// RwLock.

use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use std::time::SystemTime;
use crate::error::{Error, Result};
use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
use crate::renderer::Renderer;
use crate::resource::ResourceManager;

// ===== INTERNAL STATE =====

/// Global engine state storage
static ENGINE_STATE: OnceLock<EngineState> = OnceLock::new();

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

struct EngineState {
    renderer: RwLock<Option<Arc<Mutex<dyn Renderer>>>>,
    resource_manager: RwLock<Option<Arc<Mutex<ResourceManager>>>>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            renderer: RwLock::new(None),
            resource_manager: RwLock::new(None),
        }
    }
}

// ===== PUBLIC API =====

/// Main engine singleton manager
///
/// # Example
///
/// ```no_run
/// use battle_city_engine::battle_city::{Engine, Renderer, Result};
///
/// fn run<R: Renderer + 'static>(backend: R) -> Result<()> {
///     Engine::initialize()?;
///     Engine::create_renderer(backend)?;
///     Engine::create_resource_manager(&std::env::current_exe().unwrap())?;
///
///     // ... render loop ...
///
///     Engine::shutdown();
///     Ok(())
/// }
/// ```
pub struct Engine;

impl Engine {
    /// Log errors before returning them
    fn log_and_return_error(error: Error) -> Error {
        crate::engine_error!("battle_city::Engine", "{}", error);
        error
    }

    fn state() -> Result<&'static EngineState> {
        ENGINE_STATE.get().ok_or_else(|| Self::log_and_return_error(
            Error::InitializationFailed("Engine not initialized. Call Engine::initialize() first.".to_string())
        ))
    }

    /// Initialize the engine. Idempotent.
    pub fn initialize() -> Result<()> {
        ENGINE_STATE.get_or_init(EngineState::new);
        Ok(())
    }

    /// Destroy all singletons
    ///
    /// The resource manager goes first so every texture and shader program is
    /// released while the renderer is still alive.
    pub fn shutdown() {
        if let Some(state) = ENGINE_STATE.get() {
            if let Ok(mut rm) = state.resource_manager.write() {
                *rm = None;
            }
            if let Ok(mut renderer) = state.renderer.write() {
                *renderer = None;
            }
            crate::engine_info!("battle_city::Engine", "Engine shut down");
        }
    }

    // ===== RENDERER API =====

    /// Wrap `renderer` and register it as the renderer singleton
    ///
    /// # Errors
    ///
    /// `Error::InitializationFailed` if the engine is not initialized or a
    /// renderer already exists.
    pub fn create_renderer<R: Renderer + 'static>(renderer: R) -> Result<Arc<Mutex<dyn Renderer>>> {
        let renderer: Arc<Mutex<dyn Renderer>> = Arc::new(Mutex::new(renderer));
        Self::register_renderer(Arc::clone(&renderer))?;
        crate::engine_info!("battle_city::Engine", "Renderer singleton created successfully");
        Ok(renderer)
    }

    pub(crate) fn register_renderer(renderer: Arc<Mutex<dyn Renderer>>) -> Result<()> {
        let state = Self::state()?;
        let mut lock = state.renderer.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Renderer lock poisoned".to_string())
            ))?;

        if lock.is_some() {
            return Err(Self::log_and_return_error(
                Error::InitializationFailed("Renderer already exists. Call Engine::destroy_renderer() first.".to_string())
            ));
        }

        *lock = Some(renderer);
        Ok(())
    }

    /// Get the renderer singleton
    pub fn renderer() -> Result<Arc<Mutex<dyn Renderer>>> {
        let state = Self::state()?;
        let lock = state.renderer.read()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Renderer lock poisoned".to_string())
            ))?;

        lock.clone()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Renderer not created. Call Engine::create_renderer() first.".to_string())
            ))
    }

    /// Remove the renderer singleton. Existing references stay valid until dropped.
    pub fn destroy_renderer() -> Result<()> {
        let state = Self::state()?;
        let mut lock = state.renderer.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Renderer lock poisoned".to_string())
            ))?;

        *lock = None;
        crate::engine_info!("battle_city::Engine", "Renderer singleton destroyed");
        Ok(())
    }

    // ===== RESOURCE MANAGER API =====

    /// Create the resource manager singleton on top of the current renderer
    ///
    /// # Arguments
    ///
    /// * `executable_path` - Path of the running executable; assets are
    ///   resolved against its directory
    ///
    /// # Errors
    ///
    /// `Error::InitializationFailed` if the engine is not initialized, no
    /// renderer exists, or a resource manager already exists.
    pub fn create_resource_manager(executable_path: &Path) -> Result<Arc<Mutex<ResourceManager>>> {
        let renderer = Self::renderer()?;
        let state = Self::state()?;
        let mut lock = state.resource_manager.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("ResourceManager lock poisoned".to_string())
            ))?;

        if lock.is_some() {
            return Err(Self::log_and_return_error(
                Error::InitializationFailed("ResourceManager already exists. Call Engine::destroy_resource_manager() first.".to_string())
            ));
        }

        let resource_manager = Arc::new(Mutex::new(ResourceManager::new(renderer, executable_path)));
        *lock = Some(Arc::clone(&resource_manager));

        crate::engine_info!("battle_city::Engine", "ResourceManager singleton created successfully");
        Ok(resource_manager)
    }

    /// Get the resource manager singleton
    pub fn resource_manager() -> Result<Arc<Mutex<ResourceManager>>> {
        let state = Self::state()?;
        let lock = state.resource_manager.read()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("ResourceManager lock poisoned".to_string())
            ))?;

        lock.clone()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("ResourceManager not created. Call Engine::create_resource_manager() first.".to_string())
            ))
    }

    pub fn destroy_resource_manager() -> Result<()> {
        let state = Self::state()?;
        let mut lock = state.resource_manager.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("ResourceManager lock poisoned".to_string())
            ))?;

        *lock = None;
        crate::engine_info!("battle_city::Engine", "ResourceManager singleton destroyed");
        Ok(())
    }

    /// Reset all singletons for testing (only available in test builds)
    #[cfg(test)]
    pub fn reset_for_testing() {
        if let Some(state) = ENGINE_STATE.get() {
            if let Ok(mut rm) = state.resource_manager.write() {
                *rm = None;
            }
            if let Ok(mut renderer) = state.renderer.write() {
                *renderer = None;
            }
        }
    }

    // ===== LOGGING API =====

    /// Replace the default logger with a custom implementation
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset logger to DefaultLogger
    pub fn reset_logger() {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Log without file:line. Used by engine_info!, engine_warn!, etc.
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        Self::dispatch(LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: None,
            line: None,
        });
    }

    /// Log with file:line. Used by engine_error!.
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        Self::dispatch(LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: Some(file),
            line: Some(line),
        });
    }

    fn dispatch(entry: LogEntry) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(lock) = logger_lock.read() {
            lock.log(&entry);
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
