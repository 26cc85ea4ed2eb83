pub type Result<T> = std::result::Result<T, StrokeError>;

#[derive(thiserror::Error, Debug)]
pub enum StrokeError {
    #[error("no palette configured: run palette setup first")]
    NoPalette,

    #[error("no canvas configured: run canvas setup first")]
    NoCanvas,

    #[error("no custom color region configured: run custom color setup first")]
    NoCustomColors,

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("corrupt configuration: {0}")]
    CorruptConfig(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("input injection failed: {0}")]
    Input(anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StrokeError {
    pub fn invalid_settings(msg: impl Into<String>) -> Self {
        Self::InvalidSettings(msg.into())
    }

    pub fn corrupt_config(msg: impl Into<String>) -> Self {
        Self::CorruptConfig(msg.into())
    }

    /// True when the remedy is a setup step rather than a retry.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::NoPalette | Self::NoCanvas | Self::NoCustomColors | Self::CorruptConfig(_)
        )
    }
}
