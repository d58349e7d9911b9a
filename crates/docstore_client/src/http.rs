//! HTTP transport.
//!
//! The client is abstracted behind [`HttpClient`] so the REST backend can be
//! driven by an in-process fake in tests.

use std::time::Duration;

/// A completed HTTP exchange. Non-2xx statuses are not transport errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking JSON POST.
pub trait HttpClient: Send + Sync {
    /// Sends `body` as `application/json` to `url`.
    ///
    /// Returns `Err` only when no response was received.
    fn post(&self, url: &str, body: Vec<u8>) -> Result<HttpResponse, String>;
}

impl<C: HttpClient + ?Sized> HttpClient for &C {
    fn post(&self, url: &str, body: Vec<u8>) -> Result<HttpResponse, String> {
        (**self).post(url, body)
    }
}

impl<C: HttpClient + ?Sized> HttpClient for Box<C> {
    fn post(&self, url: &str, body: Vec<u8>) -> Result<HttpResponse, String> {
        (**self).post(url, body)
    }
}

/// [`HttpClient`] backed by a `ureq` agent.
pub struct UreqClient {
    agent: ureq::Agent,
    access_token: Option<String>,
}

impl UreqClient {
    /// Creates a client with a global request timeout and optional bearer token.
    pub fn new(timeout: Duration, access_token: Option<String>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            access_token,
        }
    }
}

impl std::fmt::Debug for UreqClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqClient")
            .field("authenticated", &self.access_token.is_some())
            .finish()
    }
}

impl HttpClient for UreqClient {
    fn post(&self, url: &str, body: Vec<u8>) -> Result<HttpResponse, String> {
        let mut request = self
            .agent
            .post(url)
            .header("Content-Type", "application/json");
        if let Some(token) = &self.access_token {
            request = request.header("Authorization", &format!("Bearer {token}"));
        }

        let mut response = request.send(&body[..]).map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| format!("failed to read response: {e}"))?;

        Ok(HttpResponse { status, body })
    }
}
