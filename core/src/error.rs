use thiserror::Error;

#[derive(Error, Debug)]
pub enum GachaError {
    #[error("Unknown banner '{key}'")]
    UnknownBanner { key: String },

    #[error("Invalid initial state for '{banner}': {reason}")]
    InvalidState { banner: String, reason: String },

    #[error("Invalid target count: expected at least 1, got {0}")]
    InvalidTargetCount(u32),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Numerical failure in '{banner}': {reason}")]
    Numerical { banner: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GachaError {
    /// True for the caller-facing configuration failures: bad key, bad state,
    /// bad target count or bad config. Numerical failures are defects instead.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownBanner { .. }
                | Self::InvalidState { .. }
                | Self::InvalidTargetCount(_)
                | Self::InvalidConfig(_)
        )
    }
}

pub type GachaResult<T> = Result<T, GachaError>;
