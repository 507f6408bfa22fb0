/// Session persistence and staleness rules

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Tokens are refreshed this many seconds before they actually expire.
pub const REFRESH_SKEW_SECS: i64 = 60;

/// The identity attached to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
}

/// The access/refresh token pair plus user identity. At most one session is
/// persisted at a time, and only these fields ever reach storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub user: Option<SessionUser>,
}

impl Session {
    /// True when the access token is expired or inside the skew buffer.
    /// A session without an expiry is never considered stale.
    pub fn is_stale(&self, now: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| now >= expires_at - REFRESH_SKEW_SECS)
    }

    /// Normalizes a provider token payload down to the persisted subset.
    pub fn from_tokens(tokens: &TokenResponse) -> Self {
        Session {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expires_at: tokens.expires_at,
            user: tokens.user.as_ref().map(|user| SessionUser {
                id: user.id.clone(),
                email: user.email.clone(),
            }),
        }
    }
}

/// Token payload returned by the auth provider on sign-up, sign-in, and
/// refresh. Providers send more fields than these; they are dropped rather
/// than persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub user: Option<TokenUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenUser {
    pub id: String,
    pub email: String,
}

/// Storage for the session and the optional API credential. The session is
/// owned exclusively by the store; callers replace it wholesale.
#[allow(async_fn_in_trait)]
pub trait SessionStore {
    async fn load_session(&self) -> Result<Option<Session>, StoreError>;
    async fn save_session(&self, session: &Session) -> Result<(), StoreError>;
    /// Removes the session and any cached credential.
    async fn clear_session(&self) -> Result<(), StoreError>;
    async fn load_credential(&self) -> Result<Option<String>, StoreError>;
    async fn save_credential(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store for tests and non-extension contexts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    session: RefCell<Option<Session>>,
    credential: RefCell<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn with_session(session: Session) -> Self {
        let store = MemoryStore::new();
        *store.session.borrow_mut() = Some(session);
        store
    }
}

impl SessionStore for MemoryStore {
    async fn load_session(&self) -> Result<Option<Session>, StoreError> {
        Ok(self.session.borrow().clone())
    }

    async fn save_session(&self, session: &Session) -> Result<(), StoreError> {
        *self.session.borrow_mut() = Some(session.clone());
        Ok(())
    }

    async fn clear_session(&self) -> Result<(), StoreError> {
        *self.session.borrow_mut() = None;
        *self.credential.borrow_mut() = None;
        Ok(())
    }

    async fn load_credential(&self) -> Result<Option<String>, StoreError> {
        Ok(self.credential.borrow().clone())
    }

    async fn save_credential(&self, key: &str) -> Result<(), StoreError> {
        *self.credential.borrow_mut() = Some(key.to_string());
        Ok(())
    }
}

/// Epoch-seconds clock, injectable so expiry logic is testable.
pub trait Clock {
    fn now(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[cfg(target_arch = "wasm32")]
    fn now(&self) -> i64 {
        (js_sys::Date::now() / 1000.0) as i64
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn now(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() as i64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn session(expires_at: Option<i64>) -> Session {
        Session {
            access_token: "A1".to_string(),
            refresh_token: "R1".to_string(),
            expires_at,
            user: None,
        }
    }

    #[test]
    fn session_far_from_expiry_is_fresh() {
        assert!(!session(Some(NOW + 3600)).is_stale(NOW));
        assert!(!session(Some(NOW + REFRESH_SKEW_SECS + 1)).is_stale(NOW));
    }

    #[test]
    fn session_inside_skew_buffer_is_stale() {
        assert!(session(Some(NOW + REFRESH_SKEW_SECS)).is_stale(NOW));
        assert!(session(Some(NOW + 10)).is_stale(NOW));
        assert!(session(Some(NOW - 10)).is_stale(NOW));
    }

    #[test]
    fn session_without_expiry_is_never_stale() {
        assert!(!session(None).is_stale(NOW));
    }

    #[test]
    fn provider_extras_are_dropped_on_normalization() {
        let tokens: TokenResponse = serde_json::from_str(
            r#"{
                "access_token": "A2",
                "refresh_token": "R2",
                "expires_at": 1700003600,
                "token_type": "bearer",
                "expires_in": 3600,
                "user": {"id": "u-1", "email": "a@b.c", "role": "authenticated"}
            }"#,
        )
        .unwrap();

        let session = Session::from_tokens(&tokens);
        assert_eq!(session.access_token, "A2");
        assert_eq!(session.refresh_token, "R2");
        assert_eq!(session.expires_at, Some(1_700_003_600));
        let user = session.user.unwrap();
        assert_eq!(user.id, "u-1");
        assert_eq!(user.email, "a@b.c");

        let persisted = serde_json::to_value(&Session::from_tokens(&tokens)).unwrap();
        assert!(persisted.get("token_type").is_none());
        assert!(persisted.get("expires_in").is_none());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[tokio::test]
    async fn clearing_removes_session_and_credential() {
        let store = MemoryStore::with_session(session(Some(NOW)));
        store.save_credential("gemini-key").await.unwrap();

        store.clear_session().await.unwrap();

        assert!(store.load_session().await.unwrap().is_none());
        assert!(store.load_credential().await.unwrap().is_none());
    }
}
