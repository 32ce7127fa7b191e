//! API key, IP allow-list and session cookie handling.

use std::net::IpAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use scangate_common::{Language, MessageKey};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::config::AccessPolicy;
use crate::error::ApiError;

/// Name of the session cookie and of the key request parameter.
pub const SESSION_COOKIE: &str = "key";
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    #[error("client address is not allowed")]
    IpRejected,
    #[error("missing or invalid API key")]
    InvalidKey,
}

impl AccessError {
    pub fn status(&self) -> StatusCode {
        match self {
            AccessError::IpRejected => StatusCode::FORBIDDEN,
            AccessError::InvalidKey => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn message_key(&self) -> MessageKey {
        match self {
            AccessError::IpRejected => MessageKey::UnauthorizedIp,
            AccessError::InvalidKey => MessageKey::ApiInvalid,
        }
    }

    pub fn to_api_error(self, language: Language) -> ApiError {
        ApiError::localized(self.status(), self.message_key(), language)
    }
}

/// Stateless gate: the session token is the API key itself.
#[derive(Debug, Clone)]
pub struct AccessGate {
    policy: Arc<AccessPolicy>,
}

impl AccessGate {
    pub fn new(policy: Arc<AccessPolicy>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// An unknown peer address is rejected while the allow-list is on.
    pub fn check_ip(&self, remote: Option<IpAddr>) -> Result<(), AccessError> {
        if !self.policy.ip_allow_list_enabled() {
            return Ok(());
        }
        match remote {
            Some(ip) if self.policy.is_ip_allowed(ip) => Ok(()),
            _ => Err(AccessError::IpRejected),
        }
    }

    pub fn check_api_key(&self, supplied: Option<&str>) -> Result<(), AccessError> {
        let Some(supplied) = supplied.filter(|k| !k.is_empty()) else {
            return Err(AccessError::InvalidKey);
        };
        if bool::from(supplied.as_bytes().ct_eq(self.policy.api_key().as_bytes())) {
            Ok(())
        } else {
            Err(AccessError::InvalidKey)
        }
    }

    /// `Set-Cookie` value carrying the key.
    pub fn issue_session(&self) -> String {
        format!(
            "{}={}; Path=/; SameSite=Lax",
            SESSION_COOKIE,
            self.policy.api_key()
        )
    }

    /// `Set-Cookie` value that makes the client drop the session.
    pub fn kill_session(&self) -> String {
        format!(
            "{}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
            SESSION_COOKIE
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(allow_list: bool) -> AccessGate {
        let policy =
            AccessPolicy::new("s3cret", allow_list, &["10.1.1.1".to_string()], None, None).unwrap();
        AccessGate::new(Arc::new(policy))
    }

    #[test]
    fn test_check_ip() {
        assert!(gate(false).check_ip(None).is_ok());
        assert!(gate(false).check_ip(Some("8.8.8.8".parse().unwrap())).is_ok());

        let gate = gate(true);
        assert!(gate.check_ip(Some("10.1.1.1".parse().unwrap())).is_ok());
        assert_eq!(
            gate.check_ip(Some("10.1.1.2".parse().unwrap())),
            Err(AccessError::IpRejected)
        );
        assert_eq!(gate.check_ip(None), Err(AccessError::IpRejected));
    }

    #[test]
    fn test_check_api_key() {
        let gate = gate(false);
        assert!(gate.check_api_key(Some("s3cret")).is_ok());
        assert_eq!(gate.check_api_key(Some("s3cre")), Err(AccessError::InvalidKey));
        assert_eq!(gate.check_api_key(Some("")), Err(AccessError::InvalidKey));
        assert_eq!(gate.check_api_key(None), Err(AccessError::InvalidKey));
    }

    #[test]
    fn test_session_cookies() {
        let gate = gate(false);
        assert!(gate.issue_session().starts_with("key=s3cret;"));
        let killed = gate.kill_session();
        assert!(killed.starts_with("key=;"));
        assert!(killed.contains("Max-Age=0"));
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(AccessError::IpRejected.status(), StatusCode::FORBIDDEN);
        assert_eq!(AccessError::InvalidKey.status(), StatusCode::UNAUTHORIZED);
        let err = AccessError::InvalidKey.to_api_error(Language::En);
        assert_eq!(err.msg, MessageKey::ApiInvalid.text(Language::En));
    }
}
