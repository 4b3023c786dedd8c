//! Authenticator implementation
//!
//! Exchanges credentials for a bearer token at the fixed `/rest/login`
//! endpoint and handles the one-shot credential-retry path.

use super::types::{Credentials, LoginMethod};
use crate::error::{Error, Result};
use crate::types::{ApiError, ReasonCode};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, error, warn};

/// Authenticator performs the login flow for one session
pub struct Authenticator {
    /// Credential acquisition strategy
    method: LoginMethod,
    /// HTTP client for the login request
    http_client: Client,
}

impl Authenticator {
    /// Create a new authenticator with the given strategy
    pub fn new(method: LoginMethod) -> Self {
        Self {
            method,
            http_client: Client::new(),
        }
    }

    /// Create an authenticator sharing an existing HTTP client
    pub fn with_client(method: LoginMethod, http_client: Client) -> Self {
        Self {
            method,
            http_client,
        }
    }

    /// Exchange credentials for a bearer token.
    ///
    /// On `invalid_credentials` with the stored strategy, re-prompts and
    /// retries exactly once; any subsequent failure is terminal. HTTP 403
    /// means the account is locked and is never retried.
    pub async fn login(&self, base_url: &str) -> Result<String> {
        let endpoint = format!("{}/rest/login", base_url.trim_end_matches('/'));
        let credentials = self.acquire().await?;

        let body = self.post_login(&endpoint, &credentials).await?;
        match build_login_token(&body) {
            Ok(token) => Ok(token),
            Err(missing_field) => {
                let api_error = ApiError::from_payload(&body);
                let invalid_credentials = api_error
                    .as_ref()
                    .is_some_and(|e| e.code == ReasonCode::InvalidCredentials);

                if !(invalid_credentials && self.method.can_reacquire()) {
                    return Err(match api_error {
                        Some(api_error) => Error::auth(format!(
                            "login token retrieval was unsuccessful ({api_error})"
                        )),
                        None => missing_field,
                    });
                }

                warn!("Wrong credentials: please enter valid credentials");
                let credentials = self.reacquire().await?;
                let body = self.post_login(&endpoint, &credentials).await?;
                build_login_token(&body).map_err(|err| match ApiError::from_payload(&body) {
                    Some(api_error) => Error::auth(format!(
                        "login token retrieval was unsuccessful ({api_error})"
                    )),
                    None => err,
                })
            }
        }
    }

    /// Send the login request and decode its body
    async fn post_login(&self, endpoint: &str, credentials: &Credentials) -> Result<Value> {
        // Credentials go into the request parameters, not the body.
        let response: Response = self
            .http_client
            .post(endpoint)
            .query(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(Error::Http)?;

        if response.status() == StatusCode::FORBIDDEN {
            error!("Login failed: the account is locked");
            return Err(Error::AccountLocked);
        }

        debug!("login response status: {}", response.status());
        response.json().await.map_err(Error::Http)
    }

    /// Produce a credential bundle from the configured strategy
    async fn acquire(&self) -> Result<Credentials> {
        match &self.method {
            LoginMethod::Plain { username, password } => {
                Ok(Credentials::new(username.clone(), password.clone()))
            }

            LoginMethod::Interactive { prompt } => prompt.prompt(),

            LoginMethod::Stored { store, prompt } => match store.load()? {
                Some(credentials) => Ok(credentials),
                None => {
                    let credentials = prompt.prompt()?;
                    store.save(&credentials)?;
                    Ok(credentials)
                }
            },

            LoginMethod::EncryptedFile {
                username,
                path,
                decryptor,
            } => {
                let ciphertext = tokio::fs::read(path).await.map_err(|err| {
                    error!("Login failed: cannot read password file: {err}");
                    Error::Io(err)
                })?;
                let password = decryptor.decrypt(&ciphertext)?;
                Ok(Credentials::new(
                    username.clone(),
                    password.trim_end_matches('\n').to_string(),
                ))
            }

            LoginMethod::Managed { provider } => provider.fetch().await,
        }
    }

    /// Refresh credentials after an `invalid_credentials` rejection.
    ///
    /// Only the stored strategy supports this; the stale entry is replaced.
    async fn reacquire(&self) -> Result<Credentials> {
        match &self.method {
            LoginMethod::Stored { store, prompt } => {
                store.clear()?;
                let credentials = prompt.prompt()?;
                store.save(&credentials)?;
                Ok(credentials)
            }
            _ => Err(Error::auth(
                "credential retry is only supported for the stored strategy",
            )),
        }
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// Assemble the bearer token from the login response body.
///
/// The API returns `token_type` and `access_token` separately; the
/// `Authorization` header wants them joined with a space.
pub fn build_login_token(body: &Value) -> Result<String> {
    let token_type = body
        .get("token_type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::missing_field("token_type"))?;
    let access_token = body
        .get("access_token")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::missing_field("access_token"))?;
    Ok(format!("{token_type} {access_token}"))
}
