//! Authentication Tokens
//!
//! 인증 토큰 정의. 각 스킴은 HELLO/LOGON에 실리는 맵으로 변환된다.

use std::collections::HashMap;

use crate::bolt::packstream::PackStreamValue;

const KEY_SCHEME: &str = "scheme";
const KEY_PRINCIPAL: &str = "principal";
const KEY_CREDENTIALS: &str = "credentials";
const KEY_REALM: &str = "realm";
const KEY_PARAMETERS: &str = "parameters";

// ============================================================================
// AuthToken - 인증 토큰
// ============================================================================

/// 인증 토큰
#[derive(Debug, Clone, PartialEq)]
pub enum AuthToken {
    /// 인증 없음
    None,
    /// Basic 인증 (사용자명/비밀번호)
    Basic {
        username: String,
        password: String,
        realm: Option<String>,
    },
    /// Bearer 토큰
    Bearer { token: String },
    /// Kerberos 티켓
    Kerberos { ticket: String },
    /// 커스텀 스킴
    Custom {
        scheme: String,
        principal: String,
        credentials: String,
        realm: String,
        parameters: Option<HashMap<String, PackStreamValue>>,
    },
}

impl AuthToken {
    /// 인증 없음
    pub fn none() -> Self {
        Self::None
    }

    /// Basic 인증 토큰 생성. 빈 realm은 생략된다.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
            realm: None,
        }
    }

    /// Basic 인증 토큰 생성 (realm 포함)
    pub fn basic_with_realm(
        username: impl Into<String>,
        password: impl Into<String>,
        realm: impl Into<String>,
    ) -> Self {
        let realm = realm.into();
        Self::Basic {
            username: username.into(),
            password: password.into(),
            realm: if realm.is_empty() { None } else { Some(realm) },
        }
    }

    /// Bearer 토큰 생성
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// Kerberos 토큰 생성
    pub fn kerberos(ticket: impl Into<String>) -> Self {
        Self::Kerberos {
            ticket: ticket.into(),
        }
    }

    /// 커스텀 토큰 생성
    pub fn custom(
        scheme: impl Into<String>,
        principal: impl Into<String>,
        credentials: impl Into<String>,
        realm: impl Into<String>,
        parameters: Option<HashMap<String, PackStreamValue>>,
    ) -> Self {
        Self::Custom {
            scheme: scheme.into(),
            principal: principal.into(),
            credentials: credentials.into(),
            realm: realm.into(),
            parameters,
        }
    }

    /// 인증 스킴 이름
    pub fn scheme(&self) -> &str {
        match self {
            Self::None => "none",
            Self::Basic { .. } => "basic",
            Self::Bearer { .. } => "bearer",
            Self::Kerberos { .. } => "kerberos",
            Self::Custom { scheme, .. } => scheme,
        }
    }

    /// HELLO/LOGON에 실리는 맵으로 변환
    pub fn to_map(&self) -> HashMap<String, PackStreamValue> {
        let mut map = HashMap::new();
        map.insert(
            KEY_SCHEME.to_string(),
            PackStreamValue::String(self.scheme().to_string()),
        );

        match self {
            Self::None => {}
            Self::Basic {
                username,
                password,
                realm,
            } => {
                map.insert(
                    KEY_PRINCIPAL.to_string(),
                    PackStreamValue::String(username.clone()),
                );
                map.insert(
                    KEY_CREDENTIALS.to_string(),
                    PackStreamValue::String(password.clone()),
                );
                if let Some(realm) = realm {
                    map.insert(
                        KEY_REALM.to_string(),
                        PackStreamValue::String(realm.clone()),
                    );
                }
            }
            Self::Bearer { token } => {
                map.insert(
                    KEY_CREDENTIALS.to_string(),
                    PackStreamValue::String(token.clone()),
                );
            }
            Self::Kerberos { ticket } => {
                // Kerberos는 principal을 빈 문자열로 보낸다.
                map.insert(
                    KEY_PRINCIPAL.to_string(),
                    PackStreamValue::String(String::new()),
                );
                map.insert(
                    KEY_CREDENTIALS.to_string(),
                    PackStreamValue::String(ticket.clone()),
                );
            }
            Self::Custom {
                principal,
                credentials,
                realm,
                parameters,
                ..
            } => {
                map.insert(
                    KEY_PRINCIPAL.to_string(),
                    PackStreamValue::String(principal.clone()),
                );
                map.insert(
                    KEY_CREDENTIALS.to_string(),
                    PackStreamValue::String(credentials.clone()),
                );
                map.insert(
                    KEY_REALM.to_string(),
                    PackStreamValue::String(realm.clone()),
                );
                if let Some(params) = parameters {
                    if !params.is_empty() {
                        map.insert(
                            KEY_PARAMETERS.to_string(),
                            PackStreamValue::Map(params.clone()),
                        );
                    }
                }
            }
        }

        map
    }
}

impl Default for AuthToken {
    fn default() -> Self {
        Self::None
    }
}

// ============================================================================
// Tests
// ============================================================================
