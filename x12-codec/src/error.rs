use thiserror::Error;

#[derive(Error, Debug)]
pub enum X12Error {
    #[error("Malformed envelope [{code}]: {message}")]
    MalformedEnvelope {
        code: &'static str,
        message: String,
        segment: &'static str,
    },

    #[error("Missing required segment: {0}")]
    MissingSegment(&'static str),

    #[error("Missing element {element} in segment {segment}")]
    MissingElement {
        segment: &'static str,
        element: usize,
    },

    #[error("Invalid wire date '{0}': expected CCYYMMDD")]
    InvalidDate(String),

    #[error("Encoding error: {0}")]
    Encode(String),
}

impl X12Error {
    pub fn envelope(code: &'static str, segment: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedEnvelope {
            code,
            message: message.into(),
            segment,
        }
    }

    /// Stable diagnostic code for this error, `ENVnnn` for envelope problems
    pub fn diagnostic_code(&self) -> &'static str {
        match self {
            Self::MalformedEnvelope { code, .. } => code,
            Self::MissingSegment(_) => "SEG001",
            Self::MissingElement { .. } => "SEG002",
            Self::InvalidDate(_) => "DAT001",
            Self::Encode(_) => "ENC001",
        }
    }
}

pub type X12Result<T> = Result<T, X12Error>;
