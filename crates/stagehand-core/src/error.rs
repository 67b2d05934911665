use thiserror::Error;

#[derive(Debug, Error)]
pub enum StagehandError {
    #[error("invalid session id '{0}': must be alphanumeric with hyphens or underscores")]
    InvalidSessionId(String),

    #[error("state directory not found: {0}")]
    StateDirNotFound(String),

    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, StagehandError>;
