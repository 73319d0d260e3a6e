use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("cross-selling rule not found: {0}")]
    RuleNotFound(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

/// Coarse failure class exposed to callers of the HTTP surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterfaceErrorKind {
    BadRequest,
    NotFound,
    ServiceUnavailable,
    Internal,
}

impl InterfaceErrorKind {
    pub fn user_message(self) -> &'static str {
        match self {
            Self::BadRequest => "The request could not be processed. Check inputs and try again.",
            Self::NotFound => "The requested cross-selling rule does not exist.",
            Self::ServiceUnavailable => "The service is temporarily unavailable. Please retry shortly.",
            Self::Internal => "An unexpected internal error occurred.",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct InterfaceError {
    pub kind: InterfaceErrorKind,
    pub message: String,
    pub correlation_id: String,
}

impl ApplicationError {
    pub fn kind(&self) -> InterfaceErrorKind {
        match self {
            Self::Domain(DomainError::RuleNotFound(_)) => InterfaceErrorKind::NotFound,
            Self::Domain(DomainError::InvariantViolation(_)) => InterfaceErrorKind::BadRequest,
            Self::Persistence(_) | Self::Integration(_) => InterfaceErrorKind::ServiceUnavailable,
            Self::Configuration(_) => InterfaceErrorKind::Internal,
        }
    }

    /// Tags the error with the request's correlation id. Invariant messages are
    /// passed through bare since they describe the caller's input.
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let message = match &self {
            Self::Domain(DomainError::InvariantViolation(message))
            | Self::Persistence(message)
            | Self::Integration(message)
            | Self::Configuration(message) => message.clone(),
            Self::Domain(not_found) => not_found.to_string(),
        };
        InterfaceError { kind: self.kind(), message, correlation_id: correlation_id.into() }
    }
}
