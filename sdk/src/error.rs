use thiserror::Error;

/// Coarse classification of an [`ApimError`], used by the REST layer to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Authorization,
    InvalidArgument,
    Conflict,
    Unavailable,
    Internal,
}

#[derive(Debug, Clone, Error)]
pub enum ApimError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("user is not authorized: {0}")]
    Unauthorized(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApimError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unauthorized(_) => ErrorKind::Authorization,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::AlreadyExists(_) | Self::Conflict(_) => ErrorKind::Conflict,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    #[must_use]
    pub fn is_authorization_failure(&self) -> bool {
        self.kind() == ErrorKind::Authorization
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::Authorization => 403,
            ErrorKind::InvalidArgument => 400,
            ErrorKind::Conflict => 409,
            ErrorKind::Unavailable => 503,
            ErrorKind::Internal => 500,
        }
    }

    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    #[must_use]
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized(reason.into())
    }

    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    #[must_use]
    pub fn already_exists(what: impl Into<String>) -> Self {
        Self::AlreadyExists(what.into())
    }

    #[must_use]
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict(reason.into())
    }

    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    #[must_use]
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }
}

pub type ApimResult<T> = Result<T, ApimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_codes() {
        assert_eq!(ApimError::not_found("m-1").http_status(), 404);
        assert_eq!(ApimError::unauthorized("bob").http_status(), 403);
        assert_eq!(ApimError::invalid_argument("bad").http_status(), 400);
        assert_eq!(ApimError::already_exists("label").http_status(), 409);
        assert_eq!(ApimError::conflict("deployed").http_status(), 409);
        assert_eq!(ApimError::unavailable("billing").http_status(), 503);
        assert_eq!(ApimError::internal("boom").http_status(), 500);
    }

    #[test]
    fn authorization_is_classified_by_kind() {
        assert!(ApimError::unauthorized("x").is_authorization_failure());
        // A message that merely mentions authorization stays an internal error.
        assert!(!ApimError::internal("user is not authorized").is_authorization_failure());
    }

    #[test]
    fn error_display() {
        let err = ApimError::not_found("gateway policy mapping m-1");
        assert_eq!(err.to_string(), "not found: gateway policy mapping m-1");
        assert!(err.is_not_found());
    }
}
