use crate::resource::TextureId;

/// Failure while creating the graphics context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// No adapter matched the requested backends and power preference.
    NoAdapter(String),
    /// The adapter refused the device request.
    DeviceRequest(String),
}

impl std::fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAdapter(msg) => write!(f, "No suitable GPU adapter: {}", msg),
            Self::DeviceRequest(msg) => write!(f, "Failed to create device: {}", msg),
        }
    }
}

impl std::error::Error for GraphicsError {}

/// Failure while replaying a frame. Cleanup has already run when this is
/// returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A `SetRenderTarget` command named a texture the texture service does
    /// not know as a render target.
    MissingRenderTarget(TextureId),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRenderTarget(id) => write!(f, "Render target {} is not available", id.0),
        }
    }
}

impl std::error::Error for RenderError {}
