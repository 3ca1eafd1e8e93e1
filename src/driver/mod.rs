//! # Driver-Facing Types
//!
//! 프로토콜 코어의 공개 표면: 설정, 인증 토큰, 그래프 값 타입, 에러.
//! 상위 드라이버(세션, 풀, 라우팅 캐시)는 이 모듈의 타입으로 코어의
//! [`crate::bolt::BoltConnection`]을 사용한다.

pub mod auth;
pub mod config;
pub mod error;
pub mod types;

pub use auth::AuthToken;
pub use config::{
    AccessMode, ConnectionConfig, ConnectionConfigBuilder, ServerAddress, TrustStrategy, UriScheme,
};
pub use error::{DriverError, DriverResult};
pub use types::{
    Duration, InvalidValue, Node, Path, Point2D, Point3D, Record, Relationship, Value,
};
