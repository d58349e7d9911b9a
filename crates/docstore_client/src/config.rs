//! Connection settings for the hosted store.

use crate::error::{ClientError, ClientResult};
use std::time::Duration;

/// Production endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://datastore.googleapis.com";

/// Points the client at a local emulator (`host:port`); no credentials are sent.
pub const EMULATOR_HOST_ENV: &str = "DATASTORE_EMULATOR_HOST";
/// Overrides the production endpoint.
pub const HOST_ENV: &str = "DATASTORE_HOST";
/// OAuth2 bearer token for the production endpoint.
pub const ACCESS_TOKEN_ENV: &str = "DATASTORE_ACCESS_TOKEN";

/// Configuration of a [`RestDatastore`](crate::RestDatastore).
#[derive(Clone)]
pub struct ClientConfig {
    /// Project whose store is addressed.
    pub project_id: String,
    /// Base URL, without trailing slash.
    pub endpoint: String,
    /// Bearer token; `None` when talking to an emulator.
    pub access_token: Option<String>,
    /// Timeout of a whole request.
    pub timeout: Duration,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("project_id", &self.project_id)
            .field("endpoint", &self.endpoint)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Creates a configuration for the production endpoint without credentials.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// Reads the endpoint and credentials from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Credentials`] when no emulator is configured
    /// and `DATASTORE_ACCESS_TOKEN` is unset, and [`ClientError::Config`]
    /// for an empty project id.
    pub fn from_env(project_id: impl Into<String>) -> ClientResult<Self> {
        Self::from_lookup(project_id, |name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(project_id: impl Into<String>, lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let project_id = project_id.into();
        if project_id.trim().is_empty() {
            return Err(ClientError::config("project id must not be empty"));
        }
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(host) = var(EMULATOR_HOST_ENV) {
            let endpoint = if host.contains("://") {
                host
            } else {
                format!("http://{host}")
            };
            return Ok(Self::new(project_id).with_endpoint(endpoint));
        }

        let token = var(ACCESS_TOKEN_ENV).ok_or_else(|| {
            ClientError::credentials(format!(
                "set {ACCESS_TOKEN_ENV} to an OAuth2 access token or {EMULATOR_HOST_ENV} to use an emulator"
            ))
        })?;
        let mut config = Self::new(project_id).with_access_token(token);
        if let Some(host) = var(HOST_ENV) {
            config = config.with_endpoint(host);
        }
        Ok(config)
    }

    /// Sets the endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the bearer token.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// URL of an RPC method for this project.
    pub fn method_url(&self, method: &str) -> String {
        format!("{}/v1/projects/{}:{}", self.endpoint, self.project_id, method)
    }
}
