//! Driver Error Types
//!
//! 공개 표면에서 사용하는 에러 정의

use std::io;
use thiserror::Error;

use crate::bolt::error::{BoltError, Neo4jError};

// ============================================================================
// DriverError - 드라이버 에러
// ============================================================================

/// 드라이버 에러
#[derive(Error, Debug)]
pub enum DriverError {
    /// 연결 에러
    #[error("Connection error: {0}")]
    Connection(String),

    /// 인증 에러
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// 프로토콜 에러
    #[error("Protocol error: {0}")]
    Protocol(#[from] BoltError),

    /// 서버 에러
    #[error("Server error: {code} - {message}")]
    Server { code: String, message: String },

    /// 설정 에러
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 타입 변환 에러
    #[error("Type conversion error: {0}")]
    TypeConversion(String),

    /// 서비스 불가
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// I/O 에러
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DriverError {
    /// 연결 에러 생성
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// 인증 에러 생성
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// 설정 에러 생성
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// 타입 변환 에러 생성
    pub fn type_conversion(msg: impl Into<String>) -> Self {
        Self::TypeConversion(msg.into())
    }

    /// 서비스 불가 에러 생성
    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    /// 재시도 가능 여부
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::ServiceUnavailable(_) => true,
            Self::Protocol(e) => e.is_retryable(),
            Self::Server { code, .. } => Neo4jError::new(code.clone(), "").is_retryable(),
            _ => false,
        }
    }
}

impl From<Neo4jError> for DriverError {
    fn from(err: Neo4jError) -> Self {
        if err.is_security_error() {
            DriverError::Authentication(err.message)
        } else if err.is_transient() {
            DriverError::ServiceUnavailable(err.message)
        } else {
            DriverError::Server {
                code: err.code,
                message: err.message,
            }
        }
    }
}

// ============================================================================
// Result Type
// ============================================================================

/// 드라이버 결과 타입
pub type DriverResult<T> = Result<T, DriverError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::error::codes;

    #[test]
    fn display() {
        let err = DriverError::connection("Connection refused");
        assert_eq!(err.to_string(), "Connection error: Connection refused");

        let err = DriverError::configuration("Invalid URI");
        assert_eq!(err.to_string(), "Configuration error: Invalid URI");
    }

    #[test]
    fn retryable() {
        assert!(DriverError::connection("refused").is_retryable());
        assert!(DriverError::service_unavailable("busy").is_retryable());
        assert!(!DriverError::authentication("bad password").is_retryable());

        let err = DriverError::Server {
            code: codes::DEADLOCK_DETECTED.to_string(),
            message: "deadlock".to_string(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn from_server_failure() {
        let err: DriverError = Neo4jError::new(codes::AUTHENTICATION_FAILED, "nope").into();
        assert!(matches!(err, DriverError::Authentication(_)));

        let err: DriverError = Neo4jError::new(codes::DATABASE_UNAVAILABLE, "down").into();
        assert!(matches!(err, DriverError::ServiceUnavailable(_)));

        let err: DriverError = Neo4jError::new(codes::SYNTAX_ERROR, "bad").into();
        assert!(matches!(err, DriverError::Server { .. }));
    }

    #[test]
    fn from_bolt_error() {
        let err: DriverError = BoltError::Timeout.into();
        assert!(matches!(err, DriverError::Protocol(BoltError::Timeout)));
    }
}
