//! Bolt protocol error types.

use std::fmt;
use std::io;

use super::packstream::PackStreamError;

/// Result type for Bolt operations.
pub type BoltResult<T> = Result<T, BoltError>;

/// Errors surfaced by the protocol core.
///
/// Transport, handshake and protocol errors poison the connection; a
/// server failure leaves the connection in the failed state until RESET;
/// usage errors report caller mistakes without touching the wire.
#[derive(Debug)]
pub enum BoltError {
    /// Socket read/write/close failure. Fatal to the connection.
    Transport(io::Error),

    /// Version negotiation failure. Fatal to the connection.
    Handshake(HandshakeError),

    /// PackStream serialization failure. Fatal to the connection.
    PackStream(PackStreamError),

    /// Malformed or out-of-order protocol traffic. Fatal to the connection.
    Protocol(String),

    /// The negotiated version does not support the requested feature.
    FeatureNotSupported { feature: &'static str, version: String },

    /// Server-reported FAILURE.
    Server(Neo4jError),

    /// Server-reported FAILURE with an expired authentication token.
    /// Kept separate so callers can refresh credentials and retry.
    TokenExpired(Neo4jError),

    /// Caller violated a state-machine precondition.
    Usage(String),

    /// A read or the connect sequence exceeded its deadline. Fatal.
    Timeout,

    /// The operation was cancelled. Fatal to the connection.
    Cancelled,

    /// The peer closed the stream mid-conversation. Fatal.
    ConnectionClosed,

    /// A reassembled message exceeded the configured cap.
    MessageTooLarge { size: usize, max: usize },
}

impl fmt::Display for BoltError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoltError::Transport(e) => write!(f, "Transport error: {}", e),
            BoltError::Handshake(e) => write!(f, "Handshake error: {}", e),
            BoltError::PackStream(e) => write!(f, "PackStream error: {}", e),
            BoltError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            BoltError::FeatureNotSupported { feature, version } => {
                write!(f, "{} is not supported by Bolt {}", feature, version)
            }
            BoltError::Server(e) => write!(f, "Server error: {}", e),
            BoltError::TokenExpired(e) => write!(f, "Token expired: {}", e),
            BoltError::Usage(msg) => write!(f, "Usage error: {}", msg),
            BoltError::Timeout => write!(f, "Operation timed out"),
            BoltError::Cancelled => write!(f, "Operation cancelled"),
            BoltError::ConnectionClosed => write!(f, "Connection closed by peer"),
            BoltError::MessageTooLarge { size, max } => {
                write!(f, "Message too large: {} bytes (max: {})", size, max)
            }
        }
    }
}

impl std::error::Error for BoltError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BoltError::Transport(e) => Some(e),
            BoltError::Handshake(e) => Some(e),
            BoltError::PackStream(e) => Some(e),
            BoltError::Server(e) | BoltError::TokenExpired(e) => Some(e),
            _ => None,
        }
    }
}

impl BoltError {
    /// Whether the connection must be discarded after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BoltError::Transport(_)
                | BoltError::Handshake(_)
                | BoltError::PackStream(_)
                | BoltError::Protocol(_)
                | BoltError::Timeout
                | BoltError::Cancelled
                | BoltError::ConnectionClosed
                | BoltError::MessageTooLarge { .. }
        )
    }

    /// Whether a retry layer above may reasonably try again.
    pub fn is_retryable(&self) -> bool {
        match self {
            BoltError::Server(e) => e.is_retryable(),
            BoltError::Transport(_) | BoltError::Timeout | BoltError::ConnectionClosed => true,
            _ => false,
        }
    }

    /// Wrap a server failure, routing token expiry to its own variant.
    pub fn from_failure(error: Neo4jError) -> Self {
        if error.is_token_expired() {
            BoltError::TokenExpired(error)
        } else {
            BoltError::Server(error)
        }
    }
}

impl From<io::Error> for BoltError {
    fn from(err: io::Error) -> Self {
        BoltError::Transport(err)
    }
}

impl From<HandshakeError> for BoltError {
    fn from(err: HandshakeError) -> Self {
        BoltError::Handshake(err)
    }
}

impl From<PackStreamError> for BoltError {
    fn from(err: PackStreamError) -> Self {
        BoltError::PackStream(err)
    }
}

/// Handshake failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// Server answered all zeros: none of the proposals was acceptable
    NoCompatibleVersion,
    /// Server picked a version this client never proposed
    UnsupportedVersion { major: u8, minor: u8 },
    /// Stream closed before the reply arrived
    ConnectionClosed,
}

impl fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeError::NoCompatibleVersion => {
                write!(f, "Server does not support any proposed Bolt version")
            }
            HandshakeError::UnsupportedVersion { major, minor } => {
                write!(f, "Server chose unsupported Bolt version {}.{}", major, minor)
            }
            HandshakeError::ConnectionClosed => {
                write!(f, "Connection closed during handshake")
            }
        }
    }
}

impl std::error::Error for HandshakeError {}

/// A server-reported failure: a dotted `Neo.<Category>.<Class>.<SubClass>`
/// code plus a human-readable message.
///
/// The core treats codes opaquely except for the classification
/// predicates below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neo4jError {
    /// Namespaced error code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl Neo4jError {
    /// Create a failure from its code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Classification segment of the code (`ClientError`, `TransientError`, ...).
    pub fn classification(&self) -> &str {
        self.code.split('.').nth(1).unwrap_or("")
    }

    /// Category segment of the code (`Security`, `Transaction`, ...).
    pub fn category(&self) -> &str {
        self.code.split('.').nth(2).unwrap_or("")
    }

    /// Client-side mistake reported by the server.
    pub fn is_client_error(&self) -> bool {
        self.code.starts_with("Neo.ClientError")
    }

    /// Server-internal failure.
    pub fn is_database_error(&self) -> bool {
        self.code.starts_with("Neo.DatabaseError")
    }

    /// Transient condition; retrying may succeed.
    pub fn is_transient(&self) -> bool {
        self.code.starts_with("Neo.TransientError")
    }

    /// Security failure, fatal to the session.
    pub fn is_security_error(&self) -> bool {
        self.category() == "Security"
    }

    /// Expired authentication token.
    pub fn is_token_expired(&self) -> bool {
        self.code == codes::TOKEN_EXPIRED
    }

    /// Whether a retry layer may try again. Transient errors plus a
    /// couple of cluster codes that resolve on re-routing.
    pub fn is_retryable(&self) -> bool {
        self.is_transient()
            || self.code == "Neo.ClientError.Cluster.NotALeader"
            || self.code == "Neo.ClientError.General.ForbiddenOnReadOnlyDatabase"
    }
}

impl fmt::Display for Neo4jError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for Neo4jError {}

/// Well-known server failure codes.
#[allow(missing_docs)]
pub mod codes {
    pub const AUTHENTICATION_FAILED: &str = "Neo.ClientError.Security.Unauthorized";
    pub const TOKEN_EXPIRED: &str = "Neo.ClientError.Security.TokenExpired";
    pub const SYNTAX_ERROR: &str = "Neo.ClientError.Statement.SyntaxError";
    pub const SEMANTIC_ERROR: &str = "Neo.ClientError.Statement.SemanticError";
    pub const CONSTRAINT_VIOLATION: &str = "Neo.ClientError.Schema.ConstraintValidationFailed";
    pub const INVALID_BOOKMARK: &str = "Neo.ClientError.Transaction.InvalidBookmark";
    pub const GENERAL_ERROR: &str = "Neo.DatabaseError.General.UnknownError";
    pub const TRANSACTION_TIMEOUT: &str = "Neo.TransientError.Transaction.TransactionTimedOut";
    pub const DEADLOCK_DETECTED: &str = "Neo.TransientError.Transaction.DeadlockDetected";
    pub const DATABASE_UNAVAILABLE: &str = "Neo.TransientError.General.DatabaseUnavailable";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let err = BoltError::Protocol("bad tag".into());
        assert_eq!(err.to_string(), "Protocol error: bad tag");

        let err = BoltError::FeatureNotSupported {
            feature: "LOGON",
            version: "4.4".into(),
        };
        assert_eq!(err.to_string(), "LOGON is not supported by Bolt 4.4");
    }

    #[test]
    fn from_io() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let err: BoltError = io_err.into();
        assert!(matches!(err, BoltError::Transport(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn neo4j_error_classification() {
        let err = Neo4jError::new(codes::SYNTAX_ERROR, "bad query");
        assert!(err.is_client_error());
        assert_eq!(err.classification(), "ClientError");
        assert_eq!(err.category(), "Statement");
        assert!(!err.is_transient());
        assert!(!err.is_security_error());

        let err = Neo4jError::new(codes::DEADLOCK_DETECTED, "deadlock");
        assert!(err.is_transient());
        assert!(err.is_retryable());

        let err = Neo4jError::new(codes::GENERAL_ERROR, "boom");
        assert!(err.is_database_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn security_and_token_expiry() {
        let err = Neo4jError::new(codes::AUTHENTICATION_FAILED, "nope");
        assert!(err.is_security_error());
        assert!(!err.is_token_expired());

        let err = Neo4jError::new(codes::TOKEN_EXPIRED, "expired");
        assert!(err.is_security_error());
        assert!(err.is_token_expired());

        let wrapped = BoltError::from_failure(err);
        assert!(matches!(wrapped, BoltError::TokenExpired(_)));
    }

    #[test]
    fn cluster_codes_are_retryable() {
        let err = Neo4jError::new("Neo.ClientError.Cluster.NotALeader", "follow me");
        assert!(err.is_retryable());
        assert!(!err.is_transient());
    }

    #[test]
    fn server_errors_are_not_fatal() {
        let err = BoltError::Server(Neo4jError::new(codes::SYNTAX_ERROR, ""));
        assert!(!err.is_fatal());

        let err = BoltError::Usage("PULL without RUN".into());
        assert!(!err.is_fatal());

        assert!(BoltError::Timeout.is_fatal());
        assert!(BoltError::Cancelled.is_fatal());
    }
}
