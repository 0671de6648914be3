/// Convenience result type used across the booth.
pub type BoothResult<T> = Result<T, BoothError>;

/// Top-level error taxonomy used by booth APIs.
///
/// Every variant renders as human-readable text; none of them leave a session in an
/// unusable state.
#[derive(thiserror::Error, Debug)]
pub enum BoothError {
    /// Camera permission was denied.
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    /// No camera device is present.
    #[error("camera not found: {0}")]
    CameraNotFound(String),

    /// The camera is held by another consumer.
    #[error("camera busy: {0}")]
    CameraBusy(String),

    /// Source bytes could not be decoded as an image.
    #[error("image decode failure: {0}")]
    ImageDecode(String),

    /// Stylization of a specific slot failed; the batch it belonged to was aborted.
    #[error("stylization failed for photo {}: {message}", slot + 1)]
    Stylization {
        /// Zero-based slot index of the failing photo.
        slot: usize,
        /// Gateway or decode message.
        message: String,
    },

    /// The generation model rejected image input; callers fall back to text-only generation.
    #[error("image input not supported by this model: {0}")]
    UnsupportedModelInput(String),

    /// Compositing was requested before all four slots were filled.
    #[error("compose not ready: {filled} of 4 photos captured")]
    ComposeNotReady {
        /// Number of filled slots at the time of the request.
        filled: usize,
    },

    /// Transport or protocol failure talking to the stylization backend.
    #[error("gateway error: {0}")]
    Gateway(String),

    /// Invalid input or an operation that is illegal in the current state.
    #[error("validation error: {0}")]
    Validation(String),

    /// Invalid or unreadable configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BoothError {
    /// Build a [`BoothError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`BoothError::ImageDecode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::ImageDecode(msg.into())
    }

    /// Build a [`BoothError::Gateway`] value.
    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::Gateway(msg.into())
    }

    /// Build a [`BoothError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Attribute this error to a stylization slot.
    ///
    /// Errors that already carry a slot are returned unchanged.
    pub fn for_slot(self, slot: usize) -> Self {
        match self {
            Self::Stylization { .. } => self,
            other => Self::Stylization {
                slot,
                message: other.to_string(),
            },
        }
    }

    /// Whether retrying camera acquisition may succeed.
    pub fn is_camera_error(&self) -> bool {
        matches!(
            self,
            Self::CameraUnavailable(_) | Self::CameraNotFound(_) | Self::CameraBusy(_)
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
