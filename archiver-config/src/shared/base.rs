use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required name was empty.
    #[error("`{0}` cannot be empty")]
    EmptyField(&'static str),
    /// A field holds a value outside its allowed range.
    #[error("invalid value for `{field}`: {constraint}")]
    InvalidFieldValue { field: String, constraint: String },
    /// The same attribute name appears more than once in a list.
    #[error("`{field}` contains `{attribute}` more than once")]
    DuplicateAttribute { field: &'static str, attribute: String },
}
