//! Typed bindings for the remote auth collaborator.
//!
//! The coordinator depends on the `AuthApi` trait only, so tests substitute
//! a scripted fake without any network. `HttpAuthApi` is the production
//! implementation: reqwest with a fixed request timeout and no automatic
//! retry. Failed calls surface as `ApiError`, never as panics.

pub mod normalize;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::ApiError;
use crate::models::user::{NewUser, Session, User};

/// Seam between the auth coordinator and the remote service.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /auth/login`. A token is required in the response.
    async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError>;

    /// `POST /user/register`. Returns `None` when registration succeeded
    /// but no token was issued; the caller then logs in explicitly.
    async fn register(&self, new_user: &NewUser) -> Result<Option<Session>, ApiError>;

    /// `GET /user/profile` with a bearer token. Used for startup
    /// revalidation; a 401 here means the token is dead.
    async fn profile(&self, token: &str) -> Result<User, ApiError>;

    /// `POST /auth/logout` with a bearer token. Best-effort on the caller
    /// side; the coordinator clears local state regardless of the result.
    async fn logout(&self, token: &str) -> Result<(), ApiError>;
}

/// Error payload shape the backend uses for every failure response.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    msg: Option<String>,
}

pub struct HttpAuthApi {
    client: Client,
    base_url: String,
}

impl HttpAuthApi {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Sends the request and parses the body, mapping non-2xx statuses to
    /// `Rejected` with the server's `msg` field when one is present.
    async fn send_json(&self, request: RequestBuilder) -> Result<Value, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(rejection(status, response).await);
        }
        debug!(status = status.as_u16(), "auth API call succeeded");
        let body: Value = response.json().await?;
        Ok(body)
    }
}

/// Builds the `Rejected` error for a failure response, falling back to a
/// generic message when the body carries no `msg` field.
async fn rejection(status: StatusCode, response: Response) -> ApiError {
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|b| b.msg)
        .unwrap_or_else(|| "Server error occurred".to_string());
    ApiError::Rejected {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let body = self
            .send_json(
                self.client
                    .post(self.url("/auth/login"))
                    .json(&json!({"email": email, "password": password})),
            )
            .await?;
        normalize::login_session(&body)
    }

    async fn register(&self, new_user: &NewUser) -> Result<Option<Session>, ApiError> {
        let body = self
            .send_json(self.client.post(self.url("/user/register")).json(new_user))
            .await?;
        normalize::register_session(&body)
    }

    async fn profile(&self, token: &str) -> Result<User, ApiError> {
        let result = self
            .send_json(
                self.client
                    .get(self.url("/user/profile"))
                    .bearer_auth(token),
            )
            .await;
        let body = match result {
            Err(ApiError::Rejected { status: 401, .. }) => return Err(ApiError::Unauthorized),
            other => other?,
        };
        normalize::user_from(&body)
            .ok_or_else(|| ApiError::Malformed("profile response is missing the user record".into()))
    }

    async fn logout(&self, token: &str) -> Result<(), ApiError> {
        self.send_json(
            self.client
                .post(self.url("/auth/logout"))
                .bearer_auth(token),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_stripped() {
        let api = HttpAuthApi::new("http://localhost:5000/", 30).unwrap();
        assert_eq!(api.url("/auth/login"), "http://localhost:5000/auth/login");
    }
}
