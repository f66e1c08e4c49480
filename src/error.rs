use thiserror::Error;

/// Failure kinds recognised by the finder.
///
/// None of them is retried. They are logged where they surface and, for
/// `ModelLoad`, leave inference disabled for the rest of the session.
#[derive(Debug, Error)]
pub enum FinderError {
    #[error("cannot load model: {0}")]
    ModelLoad(String),

    #[error("cannot initialize camera: {0}")]
    CameraInit(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl FinderError {
    /// Wrap an `anyhow` chain, keeping every context layer in the message.
    pub fn model_load(err: &anyhow::Error) -> Self {
        Self::ModelLoad(format!("{err:#}"))
    }

    pub fn camera_init(err: &anyhow::Error) -> Self {
        Self::CameraInit(format!("{err:#}"))
    }

    pub fn inference(err: &anyhow::Error) -> Self {
        Self::Inference(format!("{err:#}"))
    }
}
