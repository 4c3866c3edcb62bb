use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("{0} is already in the working set")]
    Duplicate(String),

    #[error("The working set is full ({max} instruments)")]
    CapacityExceeded { max: usize },

    #[error("{0} is not an available instrument")]
    UnknownInstrument(String),
}
