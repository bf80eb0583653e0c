use thiserror::Error;

/// Errors surfaced by the controller and intersection operations.
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("intersection {0} not found")]
    IntersectionNotFound(String),

    #[error("intersection {0} already exists")]
    DuplicateIntersection(String),

    #[error("invalid duration: green {green}s, yellow {yellow}s (both must be positive)")]
    InvalidDuration { green: i64, yellow: i64 },

    #[error("unknown direction {0:?}")]
    UnknownDirection(String),

    #[error("phase conflict at intersection {intersection}: {detail}")]
    PhaseConflict { intersection: String, detail: String },

    #[error("controller is already running")]
    AlreadyRunning,

    #[error("no Tokio runtime is available to run the control loops")]
    NoRuntime,

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, ControlError>;
