pub type BumpgenResult<T> = Result<T, BumpgenError>;

#[derive(thiserror::Error, Debug)]
pub enum BumpgenError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("cannot create/access output directory: {0}")]
    DirectoryCreation(String),

    #[error("encode process error: {0}")]
    EncodeProcess(String),

    #[error("probe error: {0}")]
    Probe(String),

    #[error("no background content available: {0}")]
    NoContentAvailable(String),

    #[error("no background content fits required length {required_seconds}s")]
    NoFittingContent { required_seconds: f64 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BumpgenError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn directory_creation(msg: impl Into<String>) -> Self {
        Self::DirectoryCreation(msg.into())
    }

    pub fn encode_process(msg: impl Into<String>) -> Self {
        Self::EncodeProcess(msg.into())
    }

    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe(msg.into())
    }

    /// Selection misses are a valid configuration state: the caller may
    /// proceed without a background or skip the channel entirely.
    pub fn is_selection_miss(&self) -> bool {
        matches!(
            self,
            Self::NoContentAvailable(_) | Self::NoFittingContent { .. }
        )
    }
}
