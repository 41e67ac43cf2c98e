use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("No tokio runtime available to run effects")]
    NoRuntime,
}

/// Failure payload carried by an effect's failed action.
///
/// Cloneable so it can sit inside an action enum.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EffectError {
    #[error("{0}")]
    Failed(String),

    #[error("effect panicked: {0}")]
    Panicked(String),
}

impl From<anyhow::Error> for EffectError {
    fn from(err: anyhow::Error) -> Self {
        EffectError::Failed(format!("{err:#}"))
    }
}
