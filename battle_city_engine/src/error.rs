//! Error types for the Battle City engine
//!
//! This module defines the error types used throughout the engine,
//! covering context setup, shader compilation, image decoding and
//! resource lookup.

use std::fmt;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (texture, shader program, sprite, etc.)
    InvalidResource(String),

    /// Initialization failed (engine, window, graphics context)
    InitializationFailed(String),

    /// Shader stage failed to compile or the program failed to link
    ShaderCompilationFailed(String),

    /// Image file could not be decoded into pixels
    ImageDecodeFailed(String),

    /// No resource is registered under the requested name
    ResourceNotFound(String),

    /// Asset file could not be read from disk
    FileReadFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::ShaderCompilationFailed(msg) => write!(f, "Shader compilation failed: {}", msg),
            Error::ImageDecodeFailed(msg) => write!(f, "Image decode failed: {}", msg),
            Error::ResourceNotFound(msg) => write!(f, "Resource not found: {}", msg),
            Error::FileReadFailed(msg) => write!(f, "File read failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
