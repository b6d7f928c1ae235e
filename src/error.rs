//! Error kinds surfaced by every ShareIt operation
#[derive(thiserror::Error, Debug)]
pub enum ShareItError {
    /// The entity is absent, or the caller lacks the relationship the
    /// operation requires (not the owner, not the booker).
    #[error("{0}")]
    NotFound(String),
    /// A business rule was violated.
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    AlreadyExists(String),
    #[error("{0}")]
    IllegalArgument(String),
    /// The record is still referenced by others and cannot be removed.
    #[error("{0}")]
    Conflict(String),
    #[error("Storage failure: {0}")]
    Storage(#[from] sled::Error),
    #[error("Record encoding failure: {0}")]
    Codec(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    AlreadyExists,
    IllegalArgument,
    Conflict,
    Internal,
}

impl ShareItError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }
    pub fn illegal_argument(msg: impl Into<String>) -> Self {
        Self::IllegalArgument(msg.into())
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::IllegalArgument(_) => ErrorKind::IllegalArgument,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Storage(_) | Self::Codec(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status an outer controller layer should answer with
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::Validation | ErrorKind::IllegalArgument => 400,
            ErrorKind::AlreadyExists | ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
        }
    }
}

impl From<minicbor::decode::Error> for ShareItError {
    fn from(err: minicbor::decode::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

pub type ShareItResult<T> = Result<T, ShareItError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(ShareItError::not_found("x").status_code(), 404);
        assert_eq!(ShareItError::validation("x").status_code(), 400);
        assert_eq!(ShareItError::already_exists("x").status_code(), 409);
        assert_eq!(ShareItError::illegal_argument("x").status_code(), 400);
        assert_eq!(ShareItError::conflict("x").status_code(), 409);
        assert_eq!(ShareItError::Codec("x".into()).status_code(), 500);
    }

    #[test]
    fn message_is_the_violated_rule() {
        let err = ShareItError::illegal_argument("Unknown state: SOMETIMES");
        assert_eq!(err.to_string(), "Unknown state: SOMETIMES");
    }
}
