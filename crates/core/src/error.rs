/// Result alias that carries the custom [`VisualizerError`] type.
pub type Result<T> = std::result::Result<T, VisualizerError>;

/// Common error type for the core crate.
///
/// The per-frame pipeline never produces one of these; they only surface from
/// preset handling, spectrum analysis and the shared handles around it.
#[derive(Debug, thiserror::Error)]
pub enum VisualizerError {
    #[error("{0}")]
    Message(String),
    /// Input rejected before it reaches any stateful component.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("preset encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("spectrum analysis failed: {0}")]
    Fft(#[from] realfft::FftError),
}

impl VisualizerError {
    /// Wraps a free-form message, used where no richer variant applies.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}
