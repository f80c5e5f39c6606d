use thiserror::Error;

pub type AfResult<T> = Result<T, AfError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AfError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Index out of bounds: {what} (index={index}, len={len})")]
    IndexOob {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Too many {what}: index {index} does not fit")]
    CapacityExceeded { what: &'static str, index: usize },

    #[error("Duplicate parameter name: {name}")]
    DuplicateName { name: String },

    #[error("Parameter not found by name: {name} (valid names: {})", valid.join(", "))]
    UnknownName { name: String, valid: Vec<String> },
}
