use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown phase: {0}")]
    UnknownPhase(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(i64),
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CoreError::UnknownPhase("voting".to_string());
        assert!(error.to_string().contains("voting"));
    }
}
