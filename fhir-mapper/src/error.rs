use thiserror::Error;

#[derive(Error, Debug)]
pub enum FhirError {
    #[error("Unsupported resource type: expected '{expected}', found '{found}'")]
    UnsupportedResourceType {
        expected: &'static str,
        found: String,
    },

    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

pub type FhirResult<T> = Result<T, FhirError>;
