use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Rule load failed: {0}")]
    RuleLoadError(String),

    #[error("Rule set is empty")]
    EmptyRuleSet,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type RuleResult<T> = Result<T, RuleError>;
