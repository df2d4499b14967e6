use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::{AuthBackend, SessionError, SessionUser, SignedIn};

/// [`AuthBackend`] that talks to a running API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAuthBackend {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl HttpAuthBackend {
    /// `base_url` is the API root including its prefix, e.g.
    /// `https://api.example.com/api`.
    pub fn new(base_url: &str) -> Result<Self, SessionError> {
        let mut base_url = Url::parse(base_url.trim())
            .map_err(|err| SessionError::Validation(format!("invalid API url: {err}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| SessionError::Network(err.to_string()))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, SessionError> {
        self.base_url.join(path).map_err(|err| SessionError::Server(err.to_string()))
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, SessionError> {
        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|err| SessionError::Server(err.to_string()));
        }

        let body = response.json::<ErrorBody>().await.ok();
        Err(map_error(status, body))
    }
}

fn map_error(status: StatusCode, body: Option<ErrorBody>) -> SessionError {
    let (code, detail) = match body {
        Some(body) => (body.code, body.detail),
        None => (None, None),
    };
    let detail = detail.unwrap_or_else(|| status.to_string());

    match code.as_deref() {
        Some("auth") => SessionError::Unauthorized,
        Some("forbidden") => SessionError::Forbidden,
        Some("validation") => SessionError::Validation(detail),
        Some("conflict") => SessionError::Conflict,
        Some("rate_limited") => SessionError::RateLimited,
        Some("unavailable") => SessionError::Unavailable,
        _ => match status {
            StatusCode::UNAUTHORIZED => SessionError::Unauthorized,
            StatusCode::FORBIDDEN => SessionError::Forbidden,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                SessionError::Validation(detail)
            }
            StatusCode::CONFLICT => SessionError::Conflict,
            StatusCode::TOO_MANY_REQUESTS => SessionError::RateLimited,
            StatusCode::SERVICE_UNAVAILABLE => SessionError::Unavailable,
            _ => SessionError::Server(detail),
        },
    }
}

fn transport(err: reqwest::Error) -> SessionError {
    SessionError::Network(err.to_string())
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, email: &str, password: &str) -> Result<SignedIn, SessionError> {
        let response = self
            .client
            .post(self.endpoint("auth/login")?)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport)?;
        Self::parse(response).await
    }

    async fn verify(&self, token: &str) -> Result<SessionUser, SessionError> {
        let response = self
            .client
            .get(self.endpoint("auth/verify")?)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        Self::parse(response).await
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SessionUser, SessionError> {
        let response = self
            .client
            .post(self.endpoint("auth/register")?)
            .json(&json!({ "email": email, "password": password, "full_name": full_name }))
            .send()
            .await
            .map_err(transport)?;
        let signed_up: SignedIn = Self::parse(response).await?;
        Ok(signed_up.user)
    }
}
