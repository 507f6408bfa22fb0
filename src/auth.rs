/// Auth provider client: sign-up, sign-in, token refresh

use reqwest::Client;
use serde_json::{Value, json};

use crate::config::Config;
use crate::error::AuthError;
use crate::session::TokenResponse;

/// Client for the auth provider's HTTP API. Every request carries the
/// project `apikey` header and a JSON body.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: Client,
    base_url: String,
    anon_key: String,
}

impl AuthClient {
    pub fn new(config: &Config) -> Self {
        AuthClient {
            http: Client::new(),
            base_url: config.auth_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<TokenResponse, AuthError> {
        self.token_request(
            "/auth/v1/signup",
            json!({ "email": email, "password": password }),
        )
        .await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<TokenResponse, AuthError> {
        self.token_request(
            "/auth/v1/token?grant_type=password",
            json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Exchanges the refresh token for a new pair. Always the refresh token,
    /// never the access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        self.token_request(
            "/auth/v1/token?grant_type=refresh_token",
            json!({ "refresh_token": refresh_token }),
        )
        .await
    }

    async fn token_request(&self, path: &str, body: Value) -> Result<TokenResponse, AuthError> {
        let res = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let message = res
                .json::<Value>()
                .await
                .ok()
                .map(|body| provider_message(&body))
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(AuthError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        Ok(res.json().await?)
    }
}

/// Providers are inconsistent about where the human-readable message lives.
fn provider_message(body: &Value) -> String {
    for key in ["error_description", "msg", "message"] {
        if let Some(message) = body.get(key).and_then(Value::as_str) {
            return message.to_string();
        }
    }
    "Authentication failed".to_string()
}
