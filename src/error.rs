use thiserror::Error;

/// Errors reported by constructors, builders and opt-in validation.
///
/// The numeric hot path (forward pass, backprop, optimizer steps) never fails;
/// degenerate numerics are replaced by safe fallbacks instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid shape: {0}")]
    InvalidShape(String),

    #[cfg(feature = "serde")]
    #[error("json error: {0}")]
    Json(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn config<S: Into<String>>(msg: S) -> Self {
        Error::InvalidConfig(msg.into())
    }

    pub(crate) fn data<S: Into<String>>(msg: S) -> Self {
        Error::InvalidData(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_category() {
        assert_eq!(
            Error::config("momentum must be finite").to_string(),
            "invalid config: momentum must be finite"
        );
        assert!(Error::data("row 3").to_string().starts_with("invalid data"));
        assert!(
            Error::InvalidShape("2x3 vs 3x2".to_owned())
                .to_string()
                .contains("2x3 vs 3x2")
        );
    }
}
