//! JSON API client for provider requests
//!
//! A thin wrapper over `reqwest` that adds bearer authentication, a fixed
//! user agent and a mapping from HTTP status codes to [`SyncError`].

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Result, SyncError};

const API_USER_AGENT: &str = concat!("fitsync/", env!("CARGO_PKG_VERSION"));

/// Authenticated JSON client bound to one provider base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the full URL for a given path
    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn build_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(API_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| SyncError::config("access token contains invalid characters"))?;
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    /// Make an authenticated GET request and return the response
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = self.build_url(path);
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(&url)
            .headers(self.build_headers()?)
            .send()
            .await?;
        handle_response_status(response, path).await
    }

    /// Make an authenticated GET request and deserialize the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.get(path).await?;
        response.json().await.map_err(|e| {
            SyncError::invalid_response(format!("Failed to parse JSON response: {}", e))
        })
    }

    /// Like [`get_json`](Self::get_json) but a 404, an empty body or `null` yields `None`
    pub async fn get_optional(&self, path: &str) -> Result<Option<serde_json::Value>> {
        let response = match self.get(path).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        match serde_json::from_str(&body)? {
            serde_json::Value::Null => Ok(None),
            value => Ok(Some(value)),
        }
    }
}

/// Convert non-success status codes to errors
async fn handle_response_status(response: Response, path: &str) -> Result<Response> {
    let status = response.status();

    match status {
        s if s.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SyncError::NotAuthenticated),
        StatusCode::TOO_MANY_REQUESTS => Err(SyncError::RateLimited),
        StatusCode::NOT_FOUND => Err(SyncError::NotFound(path.to_string())),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(SyncError::Api {
                status: status.as_u16(),
                message: body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.uri(), "secret", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_build_url_trims_trailing_slash() {
        let client =
            ApiClient::new("https://api.example.com/", "t", Duration::from_secs(1)).unwrap();
        assert_eq!(client.build_url("/a/b"), "https://api.example.com/a/b");
    }

    #[tokio::test]
    async fn test_get_json_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/items"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"n": 1})))
            .mount(&server)
            .await;

        let value: serde_json::Value = client(&server).get_json("/items").await.unwrap();
        assert_eq!(value["n"], 1);
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;
        for (route, status) in [("/auth", 401), ("/slow", 429), ("/gone", 404), ("/boom", 500)] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
                .mount(&server)
                .await;
        }
        let client = client(&server);

        assert!(matches!(client.get("/auth").await, Err(SyncError::NotAuthenticated)));
        assert!(matches!(client.get("/slow").await, Err(SyncError::RateLimited)));
        assert!(matches!(client.get("/gone").await, Err(SyncError::NotFound(_))));
        match client.get("/boom").await {
            Err(SyncError::Api { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "nope");
            }
            other => panic!("unexpected: {:?}", other.map(|r| r.status())),
        }
    }

    #[tokio::test]
    async fn test_get_optional_treats_404_as_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/empty"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        let client = client(&server);
        assert!(client.get_optional("/missing").await.unwrap().is_none());
        assert!(client.get_optional("/empty").await.unwrap().is_none());
    }
}
