//! Firebase email/password auth client.
//!
//! Only obtains and refreshes id tokens; the identity it yields is what
//! scopes every task operation.

use std::fmt;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::UserId;
use crate::util::{compact_text, is_http_url, unix_timestamp_now};

const EXPIRY_SKEW_SECONDS: i64 = 60;

pub const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS
    }

    /// Identity used to scope task operations.
    pub fn user_id(&self) -> AuthResult<UserId> {
        UserId::new(self.user.id.clone())
            .map_err(|_| AuthError::Api("Session has no user id".to_string()))
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Where signed-in sessions are kept between runs.
pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// Endpoints and key for a Firebase project's auth API.
#[derive(Clone, PartialEq, Eq)]
pub struct FirebaseAuthConfig {
    pub api_key: String,
    pub identity_url: String,
    pub secure_token_url: String,
}

impl FirebaseAuthConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            identity_url: DEFAULT_IDENTITY_URL.to_string(),
            secure_token_url: DEFAULT_SECURE_TOKEN_URL.to_string(),
        }
    }

    /// Point both endpoints at an auth emulator (e.g. `http://localhost:9099`).
    #[must_use]
    pub fn with_emulator(mut self, host: &str) -> Self {
        let host = host.trim().trim_end_matches('/');
        self.identity_url = format!("{host}/identitytoolkit.googleapis.com/v1");
        self.secure_token_url = format!("{host}/securetoken.googleapis.com/v1");
        self
    }
}

impl fmt::Debug for FirebaseAuthConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FirebaseAuthConfig")
            .field("api_key", &"[REDACTED]")
            .field("identity_url", &self.identity_url)
            .field("secure_token_url", &self.secure_token_url)
            .finish()
    }
}

#[derive(Clone)]
pub struct FirebaseAuthClient<S: SessionPersistence> {
    config: FirebaseAuthConfig,
    client: Client,
    store: S,
}

impl<S: SessionPersistence> FirebaseAuthClient<S> {
    pub fn new(config: FirebaseAuthConfig, store: S) -> AuthResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Firebase API key must not be empty",
            ));
        }
        if !is_http_url(&config.identity_url) || !is_http_url(&config.secure_token_url) {
            return Err(AuthError::InvalidConfiguration(
                "Firebase auth URLs must include http:// or https://",
            ));
        }

        Ok(Self {
            config,
            client: Client::builder().build()?,
            store,
        })
    }

    /// Load the persisted session, refreshing it when expired.
    ///
    /// A session that cannot be refreshed is cleared and `None` returned.
    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        let Some(stored_session) = self.store.load_session()? else {
            return Ok(None);
        };

        if !stored_session.is_expired() {
            return Ok(Some(stored_session));
        }

        match self.refresh_session(&stored_session.refresh_token).await {
            Ok(mut refreshed) => {
                // The token endpoint does not echo the email.
                if refreshed.user.email.is_none() && stored_session.user.email.is_some() {
                    refreshed.user.email = stored_session.user.email;
                    self.store.save_session(&refreshed)?;
                }
                Ok(Some(refreshed))
            }
            Err(error) => {
                tracing::warn!("Failed to refresh persisted session: {}", error);
                self.store.clear_session()?;
                Ok(None)
            }
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        self.password_request("accounts:signUp", email, password)
            .await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        self.password_request("accounts:signInWithPassword", email, password)
            .await
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Refresh token must not be empty",
            ));
        }

        let request = self.keyed(
            self.client
                .post(format!("{}/token", self.config.secure_token_url))
                .form(&[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                ]),
        );
        let response = send_json::<RefreshResponse>(request).await?;
        let session = response.into_session()?;

        self.store.save_session(&session)?;
        Ok(session)
    }

    /// Forget the local session. Firebase id tokens simply expire.
    pub fn sign_out(&self) -> AuthResult<()> {
        self.store.clear_session()
    }

    async fn password_request(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<AuthSession> {
        validate_credentials(email, password)?;

        let payload = serde_json::json!({
            "email": email.trim(),
            "password": password,
            "returnSecureToken": true,
        });
        let request = self.keyed(
            self.client
                .post(format!("{}/{endpoint}", self.config.identity_url))
                .json(&payload),
        );
        let response = send_json::<PasswordResponse>(request).await?;
        let session = response.into_session()?;

        self.store.save_session(&session)?;
        Ok(session)
    }

    fn keyed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .query(&[("key", self.config.api_key.as_str())])
            .header("Accept", "application/json")
    }
}

fn validate_credentials(email: &str, password: &str) -> AuthResult<()> {
    if email.trim().is_empty() {
        return Err(AuthError::Api("Email is required".to_string()));
    }
    if password.trim().is_empty() {
        return Err(AuthError::Api("Password is required".to_string()));
    }
    Ok(())
}

async fn send_json<T: for<'de> Deserialize<'de>>(request: RequestBuilder) -> AuthResult<T> {
    let response = request.send().await?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::Api(parse_api_error(status, &body)));
    }
    Ok(response.json::<T>().await?)
}

fn parse_expires_in(value: Option<&str>) -> AuthResult<i64> {
    let seconds = value
        .and_then(|value| value.trim().parse::<i64>().ok())
        .ok_or_else(|| AuthError::Api("Auth response did not include expiresIn".to_string()))?;
    Ok(unix_timestamp_now().saturating_add(seconds))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<String>,
    local_id: Option<String>,
    email: Option<String>,
}

impl PasswordResponse {
    fn into_session(self) -> AuthResult<AuthSession> {
        match (self.id_token, self.refresh_token, self.local_id) {
            (Some(id_token), Some(refresh_token), Some(local_id)) => Ok(AuthSession {
                id_token,
                refresh_token,
                expires_at: parse_expires_in(self.expires_in.as_deref())?,
                user: AuthUser {
                    id: local_id,
                    email: self.email,
                },
            }),
            _ => Err(AuthError::Api(
                "Auth response did not include enough session fields".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<String>,
    user_id: Option<String>,
}

impl RefreshResponse {
    fn into_session(self) -> AuthResult<AuthSession> {
        match (self.id_token, self.refresh_token, self.user_id) {
            (Some(id_token), Some(refresh_token), Some(user_id)) => Ok(AuthSession {
                id_token,
                refresh_token,
                expires_at: parse_expires_in(self.expires_in.as_deref())?,
                user: AuthUser {
                    id: user_id,
                    email: None,
                },
            }),
            _ => Err(AuthError::Api(
                "Refresh response did not include enough session fields".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorResponse {
    error: Option<FirebaseErrorBody>,
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorBody {
    message: Option<String>,
}

fn friendly_error(code: &str) -> Option<&'static str> {
    // Codes may carry a suffix, e.g. "WEAK_PASSWORD : Password should be ..."
    let code = code.split(':').next().unwrap_or(code).trim();
    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            Some("Invalid email or password")
        }
        "EMAIL_EXISTS" => Some("An account already exists for this email"),
        "USER_DISABLED" => Some("This account has been disabled"),
        "WEAK_PASSWORD" => Some("Password is too weak"),
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" => Some("Session expired, sign in again"),
        _ => None,
    }
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(FirebaseErrorResponse {
        error: Some(FirebaseErrorBody {
            message: Some(message),
        }),
    }) = serde_json::from_str::<FirebaseErrorResponse>(body)
    {
        let message = friendly_error(&message).map_or_else(|| message.trim().to_string(), str::to_string);
        return format!("{} ({})", message, status.as_u16());
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct MemorySessions(Arc<Mutex<Option<AuthSession>>>);

    impl SessionPersistence for MemorySessions {
        fn load_session(&self) -> AuthResult<Option<AuthSession>> {
            Ok(self.0.lock().unwrap().clone())
        }

        fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
            *self.0.lock().unwrap() = Some(session.clone());
            Ok(())
        }

        fn clear_session(&self) -> AuthResult<()> {
            *self.0.lock().unwrap() = None;
            Ok(())
        }
    }

    fn session(expires_at: i64) -> AuthSession {
        AuthSession {
            id_token: "secret-id-token".to_string(),
            refresh_token: "secret-refresh-token".to_string(),
            expires_at,
            user: AuthUser {
                id: "uid-1".to_string(),
                email: Some("user@example.com".to_string()),
            },
        }
    }

    #[test]
    fn session_debug_redacts_tokens() {
        let rendered = format!("{:?}", session(1_700_000_000));
        assert!(!rendered.contains("secret-id-token"));
        assert!(!rendered.contains("secret-refresh-token"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn session_expiry_uses_skew() {
        assert!(session(unix_timestamp_now() + 30).is_expired());
        assert!(!session(unix_timestamp_now() + 3600).is_expired());
    }

    #[test]
    fn password_response_builds_session() {
        let response: PasswordResponse = serde_json::from_str(
            r#"{"idToken": "id", "refreshToken": "refresh", "expiresIn": "3600", "localId": "uid-1", "email": "user@example.com"}"#,
        )
        .unwrap();
        let session = response.into_session().unwrap();
        assert_eq!(session.user_id().unwrap().as_str(), "uid-1");
        assert!(!session.is_expired());
    }

    #[test]
    fn refresh_response_requires_tokens() {
        let response: RefreshResponse =
            serde_json::from_str(r#"{"id_token": "id", "expires_in": "3600"}"#).unwrap();
        assert!(response.into_session().is_err());
    }

    #[test]
    fn parse_api_error_maps_known_codes() {
        let body = r#"{"error": {"code": 400, "message": "INVALID_LOGIN_CREDENTIALS"}}"#;
        assert_eq!(
            parse_api_error(StatusCode::BAD_REQUEST, body),
            "Invalid email or password (400)"
        );
        let body = r#"{"error": {"code": 400, "message": "WEAK_PASSWORD : Password should be at least 6 characters"}}"#;
        assert_eq!(
            parse_api_error(StatusCode::BAD_REQUEST, body),
            "Password is too weak (400)"
        );
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, ""), "HTTP 502");
    }

    #[test]
    fn emulator_rewrites_endpoints() {
        let config =
            FirebaseAuthConfig::new("secret-key").with_emulator("http://localhost:9099/");
        assert_eq!(
            config.identity_url,
            "http://localhost:9099/identitytoolkit.googleapis.com/v1"
        );
        assert!(!format!("{config:?}").contains("secret-key"));
    }

    #[test]
    fn rejects_empty_api_key() {
        assert!(FirebaseAuthClient::new(FirebaseAuthConfig::new(" "), MemorySessions::default())
            .is_err());
    }

    #[tokio::test]
    async fn blank_credentials_fail_before_request() {
        let client =
            FirebaseAuthClient::new(FirebaseAuthConfig::new("key"), MemorySessions::default())
                .unwrap();
        let error = client.sign_in("  ", "password").await.unwrap_err();
        assert!(error.to_string().contains("Email is required"));
    }

    #[tokio::test]
    async fn restore_returns_fresh_session_without_network() {
        let sessions = MemorySessions::default();
        let stored = session(unix_timestamp_now() + 3600);
        sessions.save_session(&stored).unwrap();

        let client = FirebaseAuthClient::new(FirebaseAuthConfig::new("key"), sessions).unwrap();
        assert_eq!(client.restore_session().await.unwrap(), Some(stored));
    }

    #[tokio::test]
    async fn sign_out_clears_session() {
        let sessions = MemorySessions::default();
        sessions
            .save_session(&session(unix_timestamp_now() + 3600))
            .unwrap();

        let client =
            FirebaseAuthClient::new(FirebaseAuthConfig::new("key"), sessions.clone()).unwrap();
        client.sign_out().unwrap();
        assert!(sessions.load_session().unwrap().is_none());
    }

    mod http {
        use serde_json::json;
        use wiremock::matchers::{body_partial_json, body_string_contains, method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        use super::*;

        fn client_for(server: &MockServer, sessions: MemorySessions) -> FirebaseAuthClient<MemorySessions> {
            FirebaseAuthClient::new(
                FirebaseAuthConfig::new("web-key").with_emulator(&server.uri()),
                sessions,
            )
            .unwrap()
        }

        #[tokio::test]
        async fn sign_in_saves_session() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/identitytoolkit.googleapis.com/v1/accounts:signInWithPassword"))
                .and(query_param("key", "web-key"))
                .and(body_partial_json(json!({
                    "email": "user@example.com",
                    "returnSecureToken": true
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "idToken": "id",
                    "refreshToken": "refresh",
                    "expiresIn": "3600",
                    "localId": "uid-1",
                    "email": "user@example.com"
                })))
                .expect(1)
                .mount(&server)
                .await;

            let sessions = MemorySessions::default();
            let session = client_for(&server, sessions.clone())
                .sign_in(" user@example.com ", "hunter22")
                .await
                .unwrap();

            assert_eq!(session.user.id, "uid-1");
            assert_eq!(sessions.load_session().unwrap(), Some(session));
        }

        #[tokio::test]
        async fn sign_in_reports_firebase_error_code() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/identitytoolkit.googleapis.com/v1/accounts:signInWithPassword"))
                .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                    "error": {"code": 400, "message": "INVALID_LOGIN_CREDENTIALS"}
                })))
                .mount(&server)
                .await;

            let sessions = MemorySessions::default();
            let error = client_for(&server, sessions.clone())
                .sign_in("user@example.com", "wrong")
                .await
                .unwrap_err();

            assert!(error.to_string().contains("Invalid email or password"));
            assert!(sessions.load_session().unwrap().is_none());
        }

        #[tokio::test]
        async fn restore_refreshes_expired_session() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/securetoken.googleapis.com/v1/token"))
                .and(body_string_contains("grant_type=refresh_token"))
                .and(body_string_contains("refresh_token=secret-refresh-token"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "id_token": "fresh-id",
                    "refresh_token": "fresh-refresh",
                    "expires_in": "3600",
                    "user_id": "uid-1"
                })))
                .expect(1)
                .mount(&server)
                .await;

            let sessions = MemorySessions::default();
            sessions.save_session(&session(unix_timestamp_now() - 10)).unwrap();

            let restored = client_for(&server, sessions.clone())
                .restore_session()
                .await
                .unwrap()
                .unwrap();

            assert_eq!(restored.id_token, "fresh-id");
            assert_eq!(restored.user.email.as_deref(), Some("user@example.com"));
            assert!(!restored.is_expired());
            assert_eq!(sessions.load_session().unwrap(), Some(restored));
        }

        #[tokio::test]
        async fn restore_clears_session_when_refresh_fails() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/securetoken.googleapis.com/v1/token"))
                .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                    "error": {"code": 400, "message": "TOKEN_EXPIRED", "status": "INVALID_ARGUMENT"}
                })))
                .expect(1)
                .mount(&server)
                .await;

            let sessions = MemorySessions::default();
            sessions.save_session(&session(unix_timestamp_now() - 10)).unwrap();

            let restored = client_for(&server, sessions.clone())
                .restore_session()
                .await
                .unwrap();

            assert!(restored.is_none());
            assert!(sessions.load_session().unwrap().is_none());
        }
    }
}
