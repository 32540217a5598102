//! Opaque credential wrapper.
//!
//! Credentials are referenced by audit and sanitizers but owned by an
//! external collaborator (the credential store). `Debug` is implemented by
//! hand so that a stray `{:?}` in a log statement never leaks a secret.

use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    pub auth_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Credential {
    pub fn token(auth_type: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            auth_type: auth_type.into(),
            token: Some(token.into()),
            username: None,
            password: None,
        }
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            auth_type: "basic".to_string(),
            token: None,
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// Constant-time comparison, for credential rotation / revocation checks
    /// where a timing side-channel on secret equality would matter.
    pub fn secret_eq(&self, other: &Credential) -> bool {
        let a = self.secret_bytes();
        let b = other.secret_bytes();
        a.len() == b.len() && a.ct_eq(&b).into()
    }

    fn secret_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        if let Some(token) = &self.token {
            bytes.extend_from_slice(token.as_bytes());
        }
        if let Some(password) = &self.password {
            bytes.extend_from_slice(password.as_bytes());
        }
        bytes
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("auth_type", &self.auth_type)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_never_leaks_secrets() {
        let cred = Credential::token("bearer", "sk-live-super-secret");
        let debug = format!("{cred:?}");
        assert!(!debug.contains("sk-live-super-secret"));
    }

    #[test]
    fn secret_eq_compares_by_value() {
        let a = Credential::token("bearer", "abc");
        let b = Credential::token("bearer", "abc");
        let c = Credential::token("bearer", "xyz");
        assert!(a.secret_eq(&b));
        assert!(!a.secret_eq(&c));
    }
}
