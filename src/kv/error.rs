//! Store-boundary error taxonomy and classification.

use thiserror::Error;

/// Classified store-boundary error. `Auth` and `Protocol` are non-retryable and
/// non-temporary; all other variants are retryable and temporary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store connection error: {0}")]
    Connection(String),
    #[error("store timed out: {0}")]
    Timeout(String),
    #[error("store authentication failed: {0}")]
    Auth(String),
    #[error("store protocol error: {0}")]
    Protocol(String),
    #[error("store network error: {0}")]
    Network(String),
    #[error("store error: {0}")]
    Unknown(String),
    #[error("store client not ready")]
    NotReady,
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, StoreError::Auth(_) | StoreError::Protocol(_))
    }

    pub fn is_temporary(&self) -> bool {
        self.is_retryable()
    }

    /// Map a transport status code the way the client's dispatch primitive does:
    /// `1 -> Connection`, `2 -> Timeout`, `3 -> Auth`, other nonzero -> `Network`.
    pub fn from_status(status: i32, message: impl Into<String>) -> Option<Self> {
        let message = message.into();
        match status {
            0 => None,
            1 => Some(StoreError::Connection(message)),
            2 => Some(StoreError::Timeout(message)),
            3 => Some(StoreError::Auth(message)),
            _ => Some(StoreError::Network(message)),
        }
    }

    /// When the transport status is zero but the host still reports an error,
    /// substring-match fixed keyword sets to classify it.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_ascii_lowercase();
        const CONNECTION_KEYWORDS: &[&str] = &["connection refused", "connect", "broken pipe"];
        const TIMEOUT_KEYWORDS: &[&str] = &["timed out", "timeout", "deadline exceeded"];
        const AUTH_KEYWORDS: &[&str] = &["noauth", "wrongpass", "unauthenticated", "auth"];
        const PROTOCOL_KEYWORDS: &[&str] = &["protocol", "wrong number of arguments", "unknown command"];
        const NETWORK_KEYWORDS: &[&str] = &["network", "unreachable", "reset by peer", "dns"];

        if CONNECTION_KEYWORDS.iter().any(|k| lower.contains(k)) {
            StoreError::Connection(message)
        } else if TIMEOUT_KEYWORDS.iter().any(|k| lower.contains(k)) {
            StoreError::Timeout(message)
        } else if AUTH_KEYWORDS.iter().any(|k| lower.contains(k)) {
            StoreError::Auth(message)
        } else if PROTOCOL_KEYWORDS.iter().any(|k| lower.contains(k)) {
            StoreError::Protocol(message)
        } else if NETWORK_KEYWORDS.iter().any(|k| lower.contains(k)) {
            StoreError::Network(message)
        } else {
            StoreError::Unknown(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_per_contract() {
        assert_eq!(
            StoreError::from_status(1, "x"),
            Some(StoreError::Connection("x".into()))
        );
        assert_eq!(
            StoreError::from_status(2, "x"),
            Some(StoreError::Timeout("x".into()))
        );
        assert_eq!(
            StoreError::from_status(3, "x"),
            Some(StoreError::Auth("x".into()))
        );
        assert_eq!(
            StoreError::from_status(7, "x"),
            Some(StoreError::Network("x".into()))
        );
        assert_eq!(StoreError::from_status(0, "x"), None);
    }

    #[test]
    fn keyword_classification() {
        assert!(matches!(
            StoreError::from_message("Connection refused by host"),
            StoreError::Connection(_)
        ));
        assert!(matches!(
            StoreError::from_message("operation timed out"),
            StoreError::Timeout(_)
        ));
        assert!(matches!(
            StoreError::from_message("NOAUTH Authentication required"),
            StoreError::Auth(_)
        ));
        assert!(matches!(
            StoreError::from_message("ERR wrong number of arguments"),
            StoreError::Protocol(_)
        ));
        assert!(matches!(
            StoreError::from_message("network is unreachable"),
            StoreError::Network(_)
        ));
        assert!(matches!(
            StoreError::from_message("something bizarre"),
            StoreError::Unknown(_)
        ));
    }

    #[test]
    fn auth_and_protocol_are_non_retryable() {
        assert!(!StoreError::Auth("x".into()).is_retryable());
        assert!(!StoreError::Protocol("x".into()).is_retryable());
        assert!(StoreError::Connection("x".into()).is_retryable());
        assert!(StoreError::Timeout("x".into()).is_retryable());
        assert!(StoreError::Network("x".into()).is_retryable());
        assert!(StoreError::Unknown("x".into()).is_retryable());
    }
}
