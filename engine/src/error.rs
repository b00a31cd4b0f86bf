use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Every failure the engine reports to its callers.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A title or ordinal has no match.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller passed a parameter outside its valid domain.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Back/forward requested with an empty history list.
    #[error("no history in that direction")]
    NoHistory,

    /// Full-text search requested without a built index.
    #[error("full-text index unavailable")]
    IndexUnavailable,

    /// The index on disk was written by an incompatible build or is damaged.
    #[error("full-text index corrupt: {0}")]
    IndexCorrupt(String),

    /// Propagated from the archive reader.
    #[error("archive I/O failure: {0}")]
    ArchiveIo(String),

    #[error("index store error: {0}")]
    Store(#[from] sled::Error),

    #[error("index codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("index metadata error: {0}")]
    Meta(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn constraint(message: impl Into<String>) -> Self {
        EngineError::ConstraintViolation(message.into())
    }

    pub fn archive(message: impl std::fmt::Display) -> Self {
        EngineError::ArchiveIo(message.to_string())
    }

    /// Whether an interactive session can keep going after this error.
    pub fn is_recoverable(&self) -> bool {
        match self {
            EngineError::NotFound(_)
            | EngineError::ConstraintViolation(_)
            | EngineError::NoHistory
            | EngineError::IndexUnavailable
            | EngineError::IndexCorrupt(_)
            | EngineError::ArchiveIo(_) => true,
            EngineError::Store(_)
            | EngineError::Codec(_)
            | EngineError::Meta(_)
            | EngineError::Io(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_facing_kinds_are_recoverable() {
        assert!(EngineError::NoHistory.is_recoverable());
        assert!(EngineError::constraint("bad page size").is_recoverable());
        assert!(EngineError::archive("truncated cluster").is_recoverable());
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        assert!(!EngineError::from(io).is_recoverable());
    }

    #[test]
    fn messages_carry_context() {
        let err = EngineError::NotFound("Monty Python".into());
        assert_eq!(err.to_string(), "not found: Monty Python");
    }
}
