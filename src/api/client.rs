//! HTTP client that attaches the session's bearer token
//!
//! Every non-2xx response becomes an [`Error`]: 401 is always
//! [`Error::Unauthorized`] so callers can tell "session invalid" apart from
//! other failures, everything else is [`Error::Status`] carrying the server's
//! `message`. Transport failures are [`Error::Network`].

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Supplies the bearer token to attach to outgoing requests
pub trait BearerSource: Send + Sync {
    fn bearer(&self) -> Option<String>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    bearer: Option<Arc<dyn BearerSource>>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("has_bearer_source", &self.bearer.is_some())
            .finish()
    }
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer: None,
        })
    }

    /// Attach tokens from `source` to every request that has no explicit token.
    pub fn with_bearer(mut self, source: Arc<dyn BearerSource>) -> Self {
        self.bearer = Some(source);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let token = self.current_bearer();
        self.send(Method::GET, path, None::<&()>, token).await
    }

    /// GET with a caller-chosen token instead of the session's current one.
    pub async fn get_with_token<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T> {
        self.send(Method::GET, path, None::<&()>, Some(token.to_string()))
            .await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let token = self.current_bearer();
        self.send(Method::POST, path, Some(body), token).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let token = self.current_bearer();
        self.send(Method::PUT, path, Some(body), token).await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        let token = self.current_bearer();
        let request = self.request(Method::DELETE, path, token);
        let response = request.send().await?;
        check_status(response).await.map(|_| ())
    }

    fn current_bearer(&self) -> Option<String> {
        self.bearer.as_ref().and_then(|source| source.bearer())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str, token: Option<String>) -> RequestBuilder {
        tracing::debug!("{} {}", method, path);
        let builder = self.http.request(method, self.url(path));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        token: Option<String>,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.request(method, path, token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = check_status(request.send().await?).await?;
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| Error::MalformedResponse(format!("{}: {}", path, e)))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(status, &body);

    if status == StatusCode::UNAUTHORIZED {
        Err(Error::Unauthorized(message))
    } else {
        Err(Error::Status {
            status: status.as_u16(),
            message,
        })
    }
}

/// Pull `message` (or `error`) out of a JSON error body.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_message_field() {
        let msg = error_message(StatusCode::BAD_REQUEST, r#"{"message":"Email taken"}"#);
        assert_eq!(msg, "Email taken");
    }

    #[test]
    fn test_error_message_falls_back_to_error_field() {
        let msg = error_message(StatusCode::BAD_REQUEST, r#"{"error":"bad input"}"#);
        assert_eq!(msg, "bad input");
    }

    #[test]
    fn test_error_message_falls_back_to_reason() {
        let msg = error_message(StatusCode::UNAUTHORIZED, "<html>nope</html>");
        assert_eq!(msg, "Unauthorized");
    }

    #[test]
    fn test_url_joining() {
        let client = ApiClient::new(&ApiConfig {
            base_url: "http://portal.test/api/".to_string(),
            timeout_secs: 1,
        })
        .unwrap();
        assert_eq!(client.url("/auth/login"), "http://portal.test/api/auth/login");
        assert_eq!(client.url("students"), "http://portal.test/api/students");
    }
}
