//! Connection Configuration
//!
//! 연결 설정: 주소, URI 스킴, TLS 신뢰 전략, 타임아웃 등

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};

use super::auth::AuthToken;
use super::error::{DriverError, DriverResult};

/// 기본 Bolt 포트
pub const DEFAULT_BOLT_PORT: u16 = 7687;

// ============================================================================
// AccessMode - 접근 모드
// ============================================================================

/// 트랜잭션 접근 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// 읽기/쓰기 (기본값)
    #[default]
    Write,
    /// 읽기 전용
    Read,
}

impl AccessMode {
    /// 와이어 표현
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Read => "r",
            AccessMode::Write => "w",
        }
    }
}

// ============================================================================
// UriScheme - URI 스킴
// ============================================================================

/// 접속 URI 스킴
///
/// `bolt` 계열은 단일 서버, `neo4j` 계열은 라우팅을 활성화한다.
/// `+s`는 TLS, `+ssc`는 서버 인증서를 검증하지 않는 TLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriScheme {
    /// `bolt://` - 단일 서버, 평문
    Bolt,
    /// `bolt+s://` - 단일 서버, TLS
    BoltSecure,
    /// `bolt+ssc://` - 단일 서버, 인증서 검증 없는 TLS
    BoltSelfSigned,
    /// `neo4j://` - 라우팅, 평문
    Neo4j,
    /// `neo4j+s://` - 라우팅, TLS
    Neo4jSecure,
    /// `neo4j+ssc://` - 라우팅, 인증서 검증 없는 TLS
    Neo4jSelfSigned,
}

impl UriScheme {
    /// 스킴 문자열 파싱
    pub fn parse(scheme: &str) -> DriverResult<Self> {
        match scheme {
            "bolt" => Ok(UriScheme::Bolt),
            "bolt+s" => Ok(UriScheme::BoltSecure),
            "bolt+ssc" => Ok(UriScheme::BoltSelfSigned),
            "neo4j" => Ok(UriScheme::Neo4j),
            "neo4j+s" => Ok(UriScheme::Neo4jSecure),
            "neo4j+ssc" => Ok(UriScheme::Neo4jSelfSigned),
            other => Err(DriverError::configuration(format!(
                "Unknown URI scheme '{}'",
                other
            ))),
        }
    }

    /// TLS 사용 여부
    pub fn is_encrypted(&self) -> bool {
        matches!(
            self,
            UriScheme::BoltSecure
                | UriScheme::BoltSelfSigned
                | UriScheme::Neo4jSecure
                | UriScheme::Neo4jSelfSigned
        )
    }

    /// 서버 인증서 검증 생략 여부
    pub fn skips_verification(&self) -> bool {
        matches!(self, UriScheme::BoltSelfSigned | UriScheme::Neo4jSelfSigned)
    }

    /// 라우팅 활성화 여부
    pub fn is_routing(&self) -> bool {
        matches!(
            self,
            UriScheme::Neo4j | UriScheme::Neo4jSecure | UriScheme::Neo4jSelfSigned
        )
    }
}

impl fmt::Display for UriScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UriScheme::Bolt => "bolt",
            UriScheme::BoltSecure => "bolt+s",
            UriScheme::BoltSelfSigned => "bolt+ssc",
            UriScheme::Neo4j => "neo4j",
            UriScheme::Neo4jSecure => "neo4j+s",
            UriScheme::Neo4jSelfSigned => "neo4j+ssc",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// ServerAddress - 서버 주소
// ============================================================================

/// 서버 주소
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddress {
    /// 호스트
    pub host: String,
    /// 포트
    pub port: u16,
}

impl ServerAddress {
    /// 새 서버 주소 생성
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// "host:port" 또는 "host" 파싱
    pub fn parse(s: &str) -> DriverResult<Self> {
        let mut parts = s.split(':');
        let host = parts
            .next()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| DriverError::configuration("Empty host"))?;
        let port = match parts.next() {
            Some(p) => p
                .parse()
                .map_err(|_| DriverError::configuration(format!("Invalid port '{}'", p)))?,
            None => DEFAULT_BOLT_PORT,
        };
        if parts.next().is_some() {
            return Err(DriverError::configuration(format!(
                "Invalid server address '{}'",
                s
            )));
        }
        Ok(Self::new(host, port))
    }

    /// 소켓 주소 문자열
    pub fn to_socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl Default for ServerAddress {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_BOLT_PORT)
    }
}

// ============================================================================
// TrustStrategy - TLS 신뢰 전략
// ============================================================================

/// TLS 신뢰 전략
#[derive(Debug, Clone, Default)]
pub enum TrustStrategy {
    /// 시스템 루트 인증서 사용
    #[default]
    TrustSystemCas,
    /// 모든 인증서 신뢰 (개발용; `+ssc` 스킴과 동일)
    TrustAllCertificates,
    /// 지정한 PEM 인증서만 신뢰
    TrustCustomCas { certificates: Vec<Vec<u8>> },
}

impl TrustStrategy {
    /// rustls 클라이언트 설정 빌드
    pub fn client_config(&self) -> DriverResult<ClientConfig> {
        match self {
            TrustStrategy::TrustAllCertificates => {
                Ok(ClientConfig::builder()
                    .dangerous()
                    .with_custom_certificate_verifier(Arc::new(AcceptAllVerifier))
                    .with_no_client_auth())
            }
            TrustStrategy::TrustSystemCas => {
                let mut roots = RootCertStore::empty();
                roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
                Ok(ClientConfig::builder()
                    .with_root_certificates(roots)
                    .with_no_client_auth())
            }
            TrustStrategy::TrustCustomCas { certificates } => {
                let mut roots = RootCertStore::empty();
                for pem in certificates {
                    let mut reader = std::io::BufReader::new(pem.as_slice());
                    for cert in rustls_pemfile::certs(&mut reader) {
                        let cert = cert.map_err(|e| {
                            DriverError::configuration(format!("Invalid CA certificate: {}", e))
                        })?;
                        roots.add(cert).map_err(|e| {
                            DriverError::configuration(format!("Rejected CA certificate: {}", e))
                        })?;
                    }
                }
                if roots.is_empty() {
                    return Err(DriverError::configuration(
                        "No usable certificates in custom CA pool",
                    ));
                }
                Ok(ClientConfig::builder()
                    .with_root_certificates(roots)
                    .with_no_client_auth())
            }
        }
    }
}

/// `+ssc` 스킴용 검증 생략 verifier
#[derive(Debug)]
struct AcceptAllVerifier;

impl ServerCertVerifier for AcceptAllVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::ED25519,
        ]
    }
}

// ============================================================================
// ConnectionConfig - 연결 설정
// ============================================================================

/// 코어 연결 설정
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// 서버 주소
    pub address: ServerAddress,
    /// URI 스킴
    pub scheme: UriScheme,
    /// 인증 토큰
    pub auth: AuthToken,
    /// HELLO에 싣는 user agent
    pub user_agent: String,
    /// PULL fetch size (-1 = 무제한)
    pub fetch_size: i64,
    /// 핸드셰이크+HELLO까지의 연결 타임아웃
    pub connect_timeout: Duration,
    /// TCP keep-alive
    pub keep_alive: bool,
    /// TLS 신뢰 전략
    pub trust_strategy: TrustStrategy,
}

impl ConnectionConfig {
    /// URI와 인증으로 설정 생성
    pub fn new(uri: &str, auth: AuthToken) -> DriverResult<Self> {
        let (scheme_str, rest) = uri
            .split_once("://")
            .ok_or_else(|| DriverError::configuration(format!("Invalid URI '{}'", uri)))?;
        let scheme = UriScheme::parse(scheme_str)?;
        let address = ServerAddress::parse(rest)?;

        Ok(Self {
            address,
            scheme,
            auth,
            user_agent: default_user_agent(),
            fetch_size: 1000,
            connect_timeout: Duration::from_secs(30),
            keep_alive: true,
            trust_strategy: TrustStrategy::default(),
        })
    }

    /// 빌더 시작
    pub fn builder(uri: &str, auth: AuthToken) -> DriverResult<ConnectionConfigBuilder> {
        Ok(ConnectionConfigBuilder {
            config: Self::new(uri, auth)?,
        })
    }

    /// TLS를 쓸 때의 rustls 설정. `+ssc` 스킴은 신뢰 전략과 무관하게
    /// 검증을 생략한다.
    pub fn tls_client_config(&self) -> DriverResult<Option<ClientConfig>> {
        if !self.scheme.is_encrypted() {
            return Ok(None);
        }
        let strategy = if self.scheme.skips_verification() {
            &TrustStrategy::TrustAllCertificates
        } else {
            &self.trust_strategy
        };
        strategy.client_config().map(Some)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: ServerAddress::default(),
            scheme: UriScheme::Bolt,
            auth: AuthToken::default(),
            user_agent: default_user_agent(),
            fetch_size: 1000,
            connect_timeout: Duration::from_secs(30),
            keep_alive: true,
            trust_strategy: TrustStrategy::default(),
        }
    }
}

fn default_user_agent() -> String {
    format!("boltkit/{}", env!("CARGO_PKG_VERSION"))
}

// ============================================================================
// ConnectionConfigBuilder - 설정 빌더
// ============================================================================

/// 연결 설정 빌더
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    /// User agent 설정
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Fetch size 설정 (-1 = 무제한)
    pub fn with_fetch_size(mut self, fetch_size: i64) -> Self {
        self.config.fetch_size = fetch_size;
        self
    }

    /// 연결 타임아웃 설정
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Keep-alive 설정
    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.config.keep_alive = keep_alive;
        self
    }

    /// TLS 신뢰 전략 설정
    pub fn with_trust_strategy(mut self, strategy: TrustStrategy) -> Self {
        self.config.trust_strategy = strategy;
        self
    }

    /// 빌드
    pub fn build(self) -> ConnectionConfig {
        self.config
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_mode_wire_values() {
        assert_eq!(AccessMode::Read.as_str(), "r");
        assert_eq!(AccessMode::Write.as_str(), "w");
        assert_eq!(AccessMode::default(), AccessMode::Write);
    }

    #[test]
    fn scheme_parsing() {
        assert_eq!(UriScheme::parse("bolt").unwrap(), UriScheme::Bolt);
        assert_eq!(UriScheme::parse("bolt+s").unwrap(), UriScheme::BoltSecure);
        assert_eq!(
            UriScheme::parse("bolt+ssc").unwrap(),
            UriScheme::BoltSelfSigned
        );
        assert_eq!(UriScheme::parse("neo4j").unwrap(), UriScheme::Neo4j);
        assert_eq!(UriScheme::parse("neo4j+s").unwrap(), UriScheme::Neo4jSecure);
        assert_eq!(
            UriScheme::parse("neo4j+ssc").unwrap(),
            UriScheme::Neo4jSelfSigned
        );
        assert!(UriScheme::parse("http").is_err());
    }

    #[test]
    fn scheme_flags() {
        assert!(!UriScheme::Bolt.is_encrypted());
        assert!(UriScheme::BoltSecure.is_encrypted());
        assert!(UriScheme::Neo4jSelfSigned.is_encrypted());

        assert!(!UriScheme::BoltSecure.skips_verification());
        assert!(UriScheme::BoltSelfSigned.skips_verification());

        assert!(!UriScheme::Bolt.is_routing());
        assert!(UriScheme::Neo4j.is_routing());
        assert!(UriScheme::Neo4jSecure.is_routing());
    }

    #[test]
    fn address_parsing() {
        let addr = ServerAddress::parse("server1").unwrap();
        assert_eq!(addr.host, "server1");
        assert_eq!(addr.port, DEFAULT_BOLT_PORT);

        let addr = ServerAddress::parse("server2:7688").unwrap();
        assert_eq!(addr.host, "server2");
        assert_eq!(addr.port, 7688);
        assert_eq!(addr.to_socket_addr(), "server2:7688");

        assert!(ServerAddress::parse("a:b:c").is_err());
        assert!(ServerAddress::parse("host:notaport").is_err());
        assert!(ServerAddress::parse("").is_err());
    }

    #[test]
    fn config_from_uri() {
        let config = ConnectionConfig::new("bolt://localhost:7687", AuthToken::none()).unwrap();
        assert_eq!(config.scheme, UriScheme::Bolt);
        assert_eq!(config.address.host, "localhost");
        assert_eq!(config.address.port, 7687);
        assert_eq!(config.fetch_size, 1000);

        let config =
            ConnectionConfig::new("neo4j+ssc://db.example.com", AuthToken::basic("u", "p"))
                .unwrap();
        assert_eq!(config.scheme, UriScheme::Neo4jSelfSigned);
        assert_eq!(config.address.port, DEFAULT_BOLT_PORT);

        assert!(ConnectionConfig::new("localhost:7687", AuthToken::none()).is_err());
    }

    #[test]
    fn builder() {
        let config = ConnectionConfig::builder("bolt://h:1", AuthToken::none())
            .unwrap()
            .with_user_agent("app/2.0")
            .with_fetch_size(-1)
            .with_connect_timeout(Duration::from_secs(5))
            .with_keep_alive(false)
            .build();
        assert_eq!(config.user_agent, "app/2.0");
        assert_eq!(config.fetch_size, -1);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert!(!config.keep_alive);
    }

    #[test]
    fn plain_scheme_has_no_tls_config() {
        let config = ConnectionConfig::new("bolt://h", AuthToken::none()).unwrap();
        assert!(config.tls_client_config().unwrap().is_none());
    }

    #[test]
    fn custom_ca_pool_rejects_garbage() {
        let strategy = TrustStrategy::TrustCustomCas {
            certificates: vec![b"not a pem".to_vec()],
        };
        assert!(strategy.client_config().is_err());
    }
}
