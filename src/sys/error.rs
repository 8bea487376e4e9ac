use std::path::PathBuf;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The entity kind is unregistered, or its counter document was never seeded.
    #[error("no counter for entity kind `{kind}`")]
    NotFound { kind: String },

    /// The backing store rejected or failed the operation. Nothing was issued.
    #[error("{op} failed: {source}")]
    Persistence {
        op: String,
        #[source]
        source: BoxError,
    },

    #[error("insert into `{collection}` violates unique index `{index}`")]
    ConstraintViolation { collection: String, index: String },

    #[error("config {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error("provisioning step `{step}` failed: {source}")]
    Provision {
        step: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn not_found(kind: &str) -> Self {
        Self::NotFound {
            kind: kind.to_string(),
        }
    }

    pub fn persistence(op: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Persistence {
            op: op.into(),
            source: source.into(),
        }
    }

    pub fn config(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Config {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Only store failures are worth retrying; everything else is a caller or setup problem.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_persistence_is_retryable() {
        assert!(Error::persistence("increment avatarId", "timed out").is_retryable());
        assert!(!Error::not_found("avatarId").is_retryable());
        assert!(!Error::ConstraintViolation {
            collection: "avatars".to_string(),
            index: "name_1".to_string(),
        }
        .is_retryable());
    }

    #[test]
    fn provision_error_names_the_step() {
        let err = Error::Provision {
            step: "seed counter newsId".to_string(),
            source: Box::new(Error::persistence("seed newsId", "connection reset")),
        };
        let msg = err.to_string();
        assert!(msg.contains("seed counter newsId"));
        assert!(msg.contains("connection reset"));
    }
}
