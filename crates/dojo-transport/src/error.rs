/// Errors that can occur in the transport layer.
///
/// `Status` is the only variant that carries an HTTP status code. Every
/// other variant is the "status 0" family: the request never produced a
/// response the server stands behind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("server responded with status {status}")]
    Status {
        /// The HTTP status code (e.g. 401).
        status: u16,
        /// The response body, lossily decoded as UTF-8.
        body: String,
    },

    /// The server could not be reached or the connection broke mid-flight.
    #[error("network error: {0}")]
    Network(String),

    /// The request could not be built (bad URL, bad header value).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The server answered with a success status but a body we can't use.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// The status code that means "your credential is missing or invalid".
pub const UNAUTHORIZED: u16 = 401;

impl TransportError {
    /// Returns the HTTP status code, if the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` for an authentication rejection (401).
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_returns_code_only_for_status_variant() {
        let err = TransportError::Status {
            status: 404,
            body: String::new(),
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(TransportError::Network("refused".into()).status(), None);
    }

    #[test]
    fn test_is_unauthorized_matches_401() {
        let err = TransportError::Status {
            status: 401,
            body: "expired".into(),
        };
        assert!(err.is_unauthorized());

        let forbidden = TransportError::Status {
            status: 403,
            body: String::new(),
        };
        assert!(!forbidden.is_unauthorized());
        assert!(!TransportError::Network("reset".into()).is_unauthorized());
    }

    #[test]
    fn test_display_includes_status() {
        let err = TransportError::Status {
            status: 500,
            body: String::new(),
        };
        assert_eq!(err.to_string(), "server responded with status 500");
    }
}
