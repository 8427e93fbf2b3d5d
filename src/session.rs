//! Explicit session value.
//!
//! A [`Session`] exists from a successful auth exchange until logout. It
//! is owned by the application root and handed to the dashboard, which
//! discards all scoped data when the session ends. Between runs the
//! signed-in user is kept in a [`SessionStore`] under [`SESSION_KEY`].

use crate::client::SpenderClient;
use crate::error::Result;
use crate::models::{AuthRequest, Period, User, UserId};
use crate::scope::Scope;
use crate::storage::SessionStore;

/// Storage key of the persisted user.
pub const SESSION_KEY: &str = "spender_user";

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Identity returned by the auth exchange.
    user: User,
}

impl Session {
    /// Wraps an already authenticated user.
    #[inline]
    #[must_use]
    pub const fn new(user: User) -> Self {
        Self { user }
    }

    /// Signed-in user.
    #[inline]
    #[must_use]
    pub const fn user(&self) -> &User {
        &self.user
    }

    /// Identifier scoping every data request.
    #[inline]
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user.id
    }

    /// Scope of this session for `period`.
    #[inline]
    #[must_use]
    pub const fn scope(&self, period: Period) -> Scope {
        Scope::new(self.user.id, period)
    }

    /// Exchanges an identity-provider token for a user and persists it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::SpenderError::Auth`] if the server rejects
    /// the token, a transport error if the request fails, or a storage
    /// error if the user cannot be persisted.
    #[tracing::instrument(skip_all)]
    pub async fn sign_in<S: SessionStore + ?Sized>(
        client: &SpenderClient,
        request: &AuthRequest,
        store: &S,
    ) -> Result<Self> {
        let user = client.authenticate(request).await?;
        let session = Self::new(user);
        session.persist(store)?;
        tracing::info!(user = %session.user_id(), "signed in");
        Ok(session)
    }

    /// Loads the persisted session, if any.
    ///
    /// An unreadable entry is removed and treated as signed out.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub fn restore<S: SessionStore + ?Sized>(store: &S) -> Result<Option<Self>> {
        let Some(raw) = store.get(SESSION_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<User>(&raw) {
            Ok(user) => Ok(Some(Self::new(user))),
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable session");
                store.remove(SESSION_KEY)?;
                Ok(None)
            }
        }
    }

    /// Writes the user to `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the storage backend fails.
    pub fn persist<S: SessionStore + ?Sized>(&self, store: &S) -> Result<()> {
        let json = serde_json::to_string(&self.user)?;
        store.set(SESSION_KEY, &json)
    }

    /// Ends the session and forgets the persisted user.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub fn end<S: SessionStore + ?Sized>(self, store: &S) -> Result<()> {
        store.remove(SESSION_KEY)?;
        tracing::info!(user = %self.user_id(), "signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::error::SpenderError;
    use crate::storage::InMemorySessionStore;

    fn ada() -> User {
        User {
            id: UserId::new(7),
            name: "Ada".to_owned(),
            picture: String::new(),
            email: None,
        }
    }

    #[test]
    fn persist_and_restore() {
        let store = InMemorySessionStore::new();
        assert!(Session::restore(&store).unwrap().is_none());

        Session::new(ada()).persist(&store).unwrap();
        let restored = Session::restore(&store).unwrap().unwrap();
        assert_eq!(restored.user(), &ada());
    }

    #[test]
    fn end_forgets_user() {
        let store = InMemorySessionStore::new();
        let session = Session::new(ada());
        session.persist(&store).unwrap();
        session.end(&store).unwrap();
        assert!(store.get(SESSION_KEY).unwrap().is_none());
    }

    #[test]
    fn unreadable_entry_is_dropped() {
        let store = InMemorySessionStore::new();
        store.set(SESSION_KEY, "garbage").unwrap();
        assert!(Session::restore(&store).unwrap().is_none());
        assert!(store.get(SESSION_KEY).unwrap().is_none());
    }

    #[test]
    fn scope_uses_user_id() {
        let period = Period::new(2025, 3).unwrap();
        assert_eq!(Session::new(ada()).scope(period), Scope::new(UserId::new(7), period));
    }

    #[tokio::test]
    async fn sign_in_persists_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/google"))
            .and(body_partial_json(serde_json::json!({"token": "tok"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 7, "name": "Ada", "picture": ""
            })))
            .mount(&server)
            .await;
        let client = SpenderClient::builder().base_url(server.uri()).build().unwrap();
        let store = InMemorySessionStore::new();

        let request = AuthRequest::new("tok", serde_json::json!({"sub": "g-1"}));
        let session = Session::sign_in(&client, &request, &store).await.unwrap();
        assert_eq!(session.user_id(), UserId::new(7));
        assert!(Session::restore(&store).unwrap().is_some());
    }

    #[tokio::test]
    async fn rejected_token_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/google"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid token"))
            .mount(&server)
            .await;
        let client = SpenderClient::builder().base_url(server.uri()).build().unwrap();
        let store = InMemorySessionStore::new();

        let request = AuthRequest::new("bad", serde_json::Value::Null);
        let err = Session::sign_in(&client, &request, &store).await.unwrap_err();
        assert!(matches!(err, SpenderError::Auth { .. }));
        assert!(store.get(SESSION_KEY).unwrap().is_none());
    }
}
