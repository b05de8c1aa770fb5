
use thiserror::Error;


pub type Result<T> = std::result::Result<T, EngineError>;

/// Failure classes of the engine. Configuration and precondition errors are
/// rejected synchronously and leave no partial state; collaborator and
/// scheduler failures are logged by the caller and never crash the event loop.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("precondition violated: {0}")]
    Precondition(String),

    #[error("collaborator call failed: {0}")]
    Collaborator(String),

    #[error("deferred action failed: {0}")]
    SchedulerExecution(String),

    #[error("database error: {0}")]
    Database(String),
}

impl EngineError {

    pub fn configuration(message: impl Into<String>) -> EngineError {
        EngineError::Configuration(message.into())
    }

    pub fn precondition(message: impl Into<String>) -> EngineError {
        EngineError::Precondition(message.into())
    }

    pub fn collaborator(message: impl Into<String>) -> EngineError {
        EngineError::Collaborator(message.into())
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> EngineError {
        EngineError::Database(err.to_string())
    }
}

impl From<serenity::Error> for EngineError {
    fn from(err: serenity::Error) -> EngineError {
        EngineError::Collaborator(err.to_string())
    }
}
