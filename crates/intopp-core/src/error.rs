use std::fmt;

#[derive(Debug)]
pub enum ModelError {
    /// A ring layout is missing or contains a negative size.
    Validation(String),
    /// A calibration or mix precondition does not hold.
    Precondition(String),
    /// A parameter name not present in the model-parameters row shape.
    UnknownField(String),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Validation(msg) => write!(f, "validation failed: {msg}"),
            ModelError::Precondition(msg) => write!(f, "precondition failed: {msg}"),
            ModelError::UnknownField(name) => write!(f, "unknown model parameter: {name}"),
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
