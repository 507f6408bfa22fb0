/// Authenticated backend client: session lifecycle plus typed REST wrappers

use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::auth::AuthClient;
use crate::clip::{Clip, ClipPayload, Project};
use crate::config::Config;
use crate::error::ApiError;
use crate::session::{Clock, Session, SessionStore};

/// Export format for the bridge endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeFormat {
    #[default]
    Yaml,
    Markdown,
}

impl BridgeFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            BridgeFormat::Yaml => "yaml",
            BridgeFormat::Markdown => "markdown",
        }
    }
}

/// `GET /projects/{id}/export` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectExport {
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub clip_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClipsPage {
    #[serde(default)]
    pub clips: Vec<Clip>,
}

/// Backend client. Guarantees outbound calls carry a valid bearer token,
/// refreshing an expiring one at most once per call, and degrades to the
/// signed-out state when a refresh is rejected.
#[derive(Clone)]
pub struct ApiClient<S, C> {
    http: Client,
    base_url: String,
    auth: AuthClient,
    store: S,
    clock: C,
}

impl<S: SessionStore, C: Clock> ApiClient<S, C> {
    pub fn new(config: &Config, store: S, clock: C) -> Self {
        ApiClient {
            http: Client::new(),
            base_url: config.api_base.trim_end_matches('/').to_string(),
            auth: AuthClient::new(config),
            store,
            clock,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    /// Persists the normalized form of a fresh provider token payload.
    pub async fn adopt_tokens(
        &self,
        tokens: &crate::session::TokenResponse,
    ) -> Result<Session, ApiError> {
        let session = Session::from_tokens(tokens);
        self.store.save_session(&session).await?;
        Ok(session)
    }

    /// Returns a usable session, refreshing once if the stored one is stale.
    /// `None` means signed out: either nothing is stored, or the refresh was
    /// rejected and the session has been cleared. A fresh session is returned
    /// unchanged without any network traffic.
    pub async fn ensure_valid_session(&self) -> Result<Option<Session>, ApiError> {
        let Some(session) = self.store.load_session().await? else {
            return Ok(None);
        };
        if !session.is_stale(self.clock.now()) {
            return Ok(Some(session));
        }

        match self.auth.refresh(&session.refresh_token).await {
            Ok(tokens) => Ok(Some(self.adopt_tokens(&tokens).await?)),
            Err(err) => {
                log::warn!("token refresh failed, clearing session: {err}");
                self.store.clear_session().await?;
                Ok(None)
            }
        }
    }

    /// Performs a backend request with auth headers attached. Without a
    /// stored session the `Authorization` header is skipped entirely. A 401
    /// triggers exactly one refresh-and-retry; the retry response is returned
    /// as-is even if it fails again. A rejected refresh clears the session
    /// and hands back the original 401.
    pub async fn authenticated_fetch(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Response, ApiError> {
        let session = self.store.load_session().await?;
        let credential = self.store.load_credential().await?;
        let token = session.as_ref().map(|s| s.access_token.as_str());

        let res = self
            .send(method.clone(), path, body.clone(), token, credential.as_deref())
            .await?;
        if res.status() != StatusCode::UNAUTHORIZED {
            return Ok(res);
        }
        let Some(session) = session else {
            return Ok(res);
        };

        match self.auth.refresh(&session.refresh_token).await {
            Ok(tokens) => {
                let refreshed = self.adopt_tokens(&tokens).await?;
                self.send(
                    method,
                    path,
                    body,
                    Some(&refreshed.access_token),
                    credential.as_deref(),
                )
                .await
            }
            Err(err) => {
                log::warn!("token refresh failed, clearing session: {err}");
                self.store.clear_session().await?;
                Ok(res)
            }
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
        credential: Option<&str>,
    ) -> Result<Response, ApiError> {
        let mut req = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(key) = credential {
            req = req.header("X-Gemini-Key", key);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        Ok(req.send().await?)
    }

    async fn expect_json<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let res = self.authenticated_fetch(method, path, body).await?;
        let status = res.status();
        if !status.is_success() {
            return Err(ApiError::Backend {
                status: status.as_u16(),
                detail: error_detail(res, status).await,
            });
        }
        Ok(res.json().await?)
    }

    async fn expect_ok(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<(), ApiError> {
        let res = self.authenticated_fetch(method, path, body).await?;
        let status = res.status();
        if !status.is_success() {
            return Err(ApiError::Backend {
                status: status.as_u16(),
                detail: error_detail(res, status).await,
            });
        }
        Ok(())
    }

    // --- Backend endpoints ---

    pub async fn save_clip(&self, payload: &ClipPayload) -> Result<Value, ApiError> {
        self.expect_json(Method::POST, "/save", Some(serde_json::to_value(payload)?))
            .await
    }

    pub async fn ask_question(&self, question: &str) -> Result<Value, ApiError> {
        self.expect_json(Method::POST, "/chat", Some(json!({ "question": question })))
            .await
    }

    pub async fn projects(&self) -> Result<Vec<Project>, ApiError> {
        self.expect_json(Method::GET, "/projects", None).await
    }

    pub async fn create_project(&self, name: &str) -> Result<Project, ApiError> {
        self.expect_json(Method::POST, "/projects", Some(json!({ "name": name })))
            .await
    }

    pub async fn delete_project(&self, id: &str) -> Result<(), ApiError> {
        self.expect_ok(Method::DELETE, &format!("/projects/{id}"), None)
            .await
    }

    pub async fn clips(
        &self,
        project_id: Option<&str>,
        limit: usize,
    ) -> Result<ClipsPage, ApiError> {
        let mut path = format!("/clips?limit={limit}");
        if let Some(id) = project_id {
            path.push_str(&format!("&project_id={id}"));
        }
        self.expect_json(Method::GET, &path, None).await
    }

    pub async fn update_clip(&self, id: &str, text: &str, url: &str) -> Result<(), ApiError> {
        self.expect_ok(
            Method::PUT,
            &format!("/clips/{id}"),
            Some(json!({ "text": text, "url": url })),
        )
        .await
    }

    pub async fn delete_clip(&self, id: &str) -> Result<(), ApiError> {
        self.expect_ok(Method::DELETE, &format!("/clips/{id}"), None)
            .await
    }

    pub async fn export_project(&self, id: &str) -> Result<ProjectExport, ApiError> {
        self.expect_json(Method::GET, &format!("/projects/{id}/export"), None)
            .await
    }

    pub async fn export_bridge(
        &self,
        id: &str,
        format: BridgeFormat,
        compact: bool,
    ) -> Result<Value, ApiError> {
        let path = format!(
            "/projects/{id}/bridge?format={}&compact={compact}",
            format.as_str()
        );
        self.expect_json(Method::GET, &path, None).await
    }

    /// Plain unauthenticated GET used to relay around page CSP limits.
    pub async fn proxy_fetch(&self, url: &str) -> Result<Value, ApiError> {
        let res = self.http.get(url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(ApiError::Backend {
                status: status.as_u16(),
                detail: error_detail(res, status).await,
            });
        }
        Ok(res.json().await?)
    }
}

async fn error_detail(res: Response, status: StatusCode) -> String {
    res.json::<Value>()
        .await
        .ok()
        .and_then(|body| {
            body.get("detail")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::session::MemoryStore;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const NOW: i64 = 1_700_000_000;

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now(&self) -> i64 {
            self.0
        }
    }

    fn session(expires_at: i64) -> Session {
        Session {
            access_token: "A1".to_string(),
            refresh_token: "R1".to_string(),
            expires_at: Some(expires_at),
            user: None,
        }
    }

    fn client(server: &MockServer, store: MemoryStore) -> ApiClient<MemoryStore, FixedClock> {
        let config = Config {
            api_base: server.uri(),
            auth_url: server.uri(),
            anon_key: "anon".to_string(),
        };
        ApiClient::new(&config, store, FixedClock(NOW))
    }

    fn refresh_ok() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "A2",
            "refresh_token": "R2",
            "expires_at": NOW + 3600
        }))
    }

    fn refresh_mock() -> wiremock::MockBuilder {
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
    }

    #[tokio::test]
    async fn fresh_session_returned_without_any_network_call() {
        let server = MockServer::start().await;
        refresh_mock()
            .respond_with(refresh_ok())
            .expect(0)
            .mount(&server)
            .await;

        let api = client(&server, MemoryStore::with_session(session(NOW + 3600)));
        let result = api.ensure_valid_session().await.unwrap().unwrap();
        assert_eq!(result.access_token, "A1");
    }

    #[tokio::test]
    async fn no_session_means_signed_out_without_refresh() {
        let server = MockServer::start().await;
        refresh_mock()
            .respond_with(refresh_ok())
            .expect(0)
            .mount(&server)
            .await;

        let api = client(&server, MemoryStore::new());
        assert!(api.ensure_valid_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_session_triggers_exactly_one_refresh() {
        let server = MockServer::start().await;
        refresh_mock()
            .and(body_json(serde_json::json!({"refresh_token": "R1"})))
            .respond_with(refresh_ok())
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server, MemoryStore::with_session(session(NOW - 10)));
        let refreshed = api.ensure_valid_session().await.unwrap().unwrap();
        assert_eq!(refreshed.access_token, "A2");
        assert_eq!(refreshed.refresh_token, "R2");
        assert_eq!(refreshed.expires_at, Some(NOW + 3600));

        // The refreshed session is persisted wholesale.
        let stored = api.store().load_session().await.unwrap().unwrap();
        assert_eq!(stored, refreshed);
    }

    #[tokio::test]
    async fn session_inside_skew_buffer_is_refreshed() {
        let server = MockServer::start().await;
        refresh_mock()
            .respond_with(refresh_ok())
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server, MemoryStore::with_session(session(NOW + 30)));
        assert!(api.ensure_valid_session().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn rejected_refresh_clears_session_and_returns_none() {
        let server = MockServer::start().await;
        refresh_mock()
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"error_description": "revoked"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server, MemoryStore::with_session(session(NOW - 10)));
        assert!(api.ensure_valid_session().await.unwrap().is_none());
        assert!(api.store().load_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn request_without_session_sends_no_authorization_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let api = client(&server, MemoryStore::new());
        let res = api
            .authenticated_fetch(Method::GET, "/projects", None)
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn credential_header_attached_when_stored() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects"))
            .and(header("authorization", "Bearer A1"))
            .and(header("x-gemini-key", "gk-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let store = MemoryStore::with_session(session(NOW + 3600));
        store.save_credential("gk-1").await.unwrap();
        let api = client(&server, store);
        let res = api
            .authenticated_fetch(Method::GET, "/projects", None)
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unauthorized_is_retried_once_with_refreshed_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects"))
            .and(header("authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/projects"))
            .and(header("authorization", "Bearer A2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;
        refresh_mock()
            .and(body_json(serde_json::json!({"refresh_token": "R1"})))
            .respond_with(refresh_ok())
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server, MemoryStore::with_session(session(NOW + 3600)));
        let res = api
            .authenticated_fetch(Method::GET, "/projects", None)
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        // Refresh happened strictly before the retry.
        let stored = api.store().load_session().await.unwrap().unwrap();
        assert_eq!(stored.access_token, "A2");
    }

    #[tokio::test]
    async fn second_unauthorized_is_returned_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;
        refresh_mock()
            .respond_with(refresh_ok())
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server, MemoryStore::with_session(session(NOW + 3600)));
        let res = api
            .authenticated_fetch(Method::GET, "/projects", None)
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn failed_refresh_on_unauthorized_clears_session_and_keeps_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        refresh_mock()
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let store = MemoryStore::with_session(session(NOW + 3600));
        store.save_credential("gk-1").await.unwrap();
        let api = client(&server, store);
        let res = api
            .authenticated_fetch(Method::GET, "/projects", None)
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(api.store().load_session().await.unwrap().is_none());
        assert!(api.store().load_credential().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn backend_error_detail_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(serde_json::json!({"detail": "question required"})),
            )
            .mount(&server)
            .await;

        let api = client(&server, MemoryStore::new());
        match api.ask_question("").await.unwrap_err() {
            ApiError::Backend { status, detail } => {
                assert_eq!(status, 422);
                assert_eq!(detail, "question required");
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn clips_query_carries_limit_and_project() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clips"))
            .and(query_param("limit", "1000"))
            .and(query_param("project_id", "p-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"clips": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server, MemoryStore::new());
        let page = api.clips(Some("p-1"), 1000).await.unwrap();
        assert!(page.clips.is_empty());
    }

    #[tokio::test]
    async fn bridge_export_encodes_format_and_compact() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/p-1/bridge"))
            .and(query_param("format", "markdown"))
            .and(query_param("compact", "true"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"content": "# ctx"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server, MemoryStore::new());
        let bridge = api
            .export_bridge("p-1", BridgeFormat::Markdown, true)
            .await
            .unwrap();
        assert_eq!(bridge["content"], "# ctx");
    }
}
