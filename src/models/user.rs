//! Signed-in user and the auth exchange body.

use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize, Serializer};

use super::UserId;

/// Identity returned by the auth exchange.
///
/// Immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Server-side user identifier; scopes every data request.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Profile picture URL.
    #[serde(default)]
    pub picture: String,
    /// Account email, when provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Body of `POST /auth/google`.
///
/// The OAuth access token is kept secret in memory and only exposed
/// while the request body is serialized.
#[derive(Debug, Serialize)]
pub struct AuthRequest {
    /// OAuth access token from the identity provider.
    #[serde(serialize_with = "serialize_secret")]
    pub token: SecretString,
    /// Profile claims from the identity provider (`sub`, `email`, `name`, `picture`).
    pub user_info: serde_json::Value,
}

impl AuthRequest {
    /// Creates an auth exchange request.
    #[inline]
    #[must_use]
    pub fn new<T: Into<String>>(token: T, user_info: serde_json::Value) -> Self {
        Self {
            token: SecretString::from(token.into()),
            user_info,
        }
    }
}

/// Writes the exposed secret as a plain string.
fn serialize_secret<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_user_with_email() {
        let json = r#"{"id": 5, "email": "a@b.c", "name": "Ada", "picture": "http://p"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, UserId::new(5));
        assert_eq!(user.email.as_deref(), Some("a@b.c"));
    }

    #[test]
    fn auth_request_serializes_token() {
        let req = AuthRequest::new("tok-123", serde_json::json!({"sub": "g-1"}));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["token"], "tok-123");
        assert_eq!(json["user_info"]["sub"], "g-1");
    }

    #[test]
    fn auth_request_debug_redacts_token() {
        let req = AuthRequest::new("tok-123", serde_json::Value::Null);
        assert!(!format!("{req:?}").contains("tok-123"));
    }
}
