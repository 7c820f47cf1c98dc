//! Error types for vocabulary parsing.

/// Errors produced while parsing pins and peripheral names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// A pin token did not match any accepted pin form.
    #[error("invalid pin token '{token}': {detail}")]
    InvalidPin { token: String, detail: String },

    /// A peripheral instance name could not be parsed.
    #[error("invalid peripheral instance '{name}'")]
    InvalidInstance { name: String },
}

/// Result type for vocabulary parsing.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CoreError::InvalidPin {
            token: "Z99".into(),
            detail: "port out of range".into(),
        };
        assert!(err.to_string().contains("Z99"));
        assert!(err.to_string().contains("port out of range"));
    }
}
