use thiserror::Error;
use validator::error::ValidationError;

/// Why a submission was refused before any call was made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Optimization needs {required} instruments, {size} selected")]
    NotActionable { size: usize, required: String },

    #[error("Select at least one instrument before submitting")]
    EmptySelection,
}
