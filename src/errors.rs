// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the capture and composition pipeline

use crate::backends::camera::types::BackendError;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for capture session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Main error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Capture session errors (permission, hardware, capture)
    Session(SessionError),
    /// Card composition errors
    Composition(CompositionError),
    /// External collaborator errors that could not be recovered locally
    Service(ServiceError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Capture session errors
///
/// Permission errors are terminal; everything else may be retried by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Camera access was refused
    PermissionDenied,
    /// Device configuration failed; the session stays in `Configuring`
    Configuration(String),
    /// A single capture attempt failed
    Capture(String),
    /// No usable lens for the requested operation
    LensUnavailable(String),
    /// Operation requires a running session
    NotRunning,
}

impl SessionError {
    /// Whether re-invoking the failed operation can succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SessionError::PermissionDenied)
    }
}

/// Composition errors, raised before any output buffer is produced
#[derive(Debug, Clone, PartialEq)]
pub enum CompositionError {
    /// Committed scale is zero, negative or not finite
    DegenerateScale(f64),
    /// Source image has no pixels
    EmptySource,
    /// Requested output frame has no pixels
    EmptyOutput,
    /// Interactive display size is zero or not finite
    InvalidDisplaySize,
    /// The accumulated transform cannot be drawn (singular or not finite)
    DegenerateTransform,
    /// Output raster could not be allocated
    Allocation(String),
}

/// External collaborator errors
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// Service could not be reached
    Unavailable(String),
    /// Service answered but could not produce a result
    Failed(String),
    /// Persistence rejected the card
    SaveFailed(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Session(e) => write!(f, "Session error: {}", e),
            AppError::Composition(e) => write!(f, "Composition error: {}", e),
            AppError::Service(e) => write!(f, "Service error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::PermissionDenied => write!(f, "Camera access denied"),
            SessionError::Configuration(msg) => write!(f, "Configuration failed: {}", msg),
            SessionError::Capture(msg) => write!(f, "Capture failed: {}", msg),
            SessionError::LensUnavailable(msg) => write!(f, "Lens unavailable: {}", msg),
            SessionError::NotRunning => write!(f, "Capture session is not running"),
        }
    }
}

impl fmt::Display for CompositionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositionError::DegenerateScale(scale) => {
                write!(f, "Cannot render with scale {}", scale)
            }
            CompositionError::EmptySource => write!(f, "Source image is empty"),
            CompositionError::EmptyOutput => write!(f, "Output frame is empty"),
            CompositionError::InvalidDisplaySize => write!(f, "Invalid interactive display size"),
            CompositionError::DegenerateTransform => write!(f, "Transform is not drawable"),
            CompositionError::Allocation(msg) => write!(f, "Failed to allocate output: {}", msg),
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Unavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ServiceError::Failed(msg) => write!(f, "Service failed: {}", msg),
            ServiceError::SaveFailed(msg) => write!(f, "Save failed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for SessionError {}
impl std::error::Error for CompositionError {}
impl std::error::Error for ServiceError {}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}

impl From<CompositionError> for AppError {
    fn from(err: CompositionError) -> Self {
        AppError::Composition(err)
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        AppError::Service(err)
    }
}

// Hardware errors surface at the session boundary
impl From<BackendError> for SessionError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::PermissionDenied => SessionError::PermissionDenied,
            BackendError::Busy => SessionError::Capture(err.to_string()),
            BackendError::DeviceNotFound(msg) => SessionError::LensUnavailable(msg),
            other => SessionError::Configuration(other.to_string()),
        }
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Storage(err.to_string())
    }
}
