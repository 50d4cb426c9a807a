#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("school not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Common(#[from] discovery_common::error::CommonError),
}
