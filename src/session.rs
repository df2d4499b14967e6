//! Client-side session handling for the web front end.
//!
//! [`SessionStore`] owns the signed-in user and the bearer token. The token
//! lives behind a [`TokenStore`] and every call to the API goes through an
//! [`AuthBackend`], so the store can run against the real HTTP API
//! ([`HttpAuthBackend`]) or an in-process fake.

mod http;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use validator::Validate;

use crate::db::types::{SubscriptionStatus, UserRole};
use crate::services::route_guard;

pub use http::HttpAuthBackend;

/// Profile returned by the login, register and verify endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default = "default_subscription")]
    pub subscription_status: SubscriptionStatus,
    #[serde(default)]
    pub subscription_expires_at: Option<String>,
}

fn default_active() -> bool {
    true
}

fn default_subscription() -> SubscriptionStatus {
    SubscriptionStatus::Free
}

/// A bearer token paired with the profile it was issued for.
#[derive(Debug, Clone, Deserialize)]
pub struct SignedIn {
    pub token: String,
    pub user: SessionUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("invalid credentials")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("too many attempts")]
    RateLimited,
    #[error("email already registered")]
    Conflict,
    #[error("network error: {0}")]
    Network(String),
    #[error("service unavailable")]
    Unavailable,
    #[error("server error: {0}")]
    Server(String),
    #[error("token storage error: {0}")]
    Storage(String),
}

impl SessionError {
    /// Message suitable for showing next to the login form.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Validation(message) => message.clone(),
            SessionError::Unauthorized => {
                "Credenciales inválidas. Por favor, verifica tu email y contraseña.".to_string()
            }
            SessionError::Conflict => "Este correo electrónico ya está registrado.".to_string(),
            SessionError::RateLimited => {
                "Has intentado demasiadas veces. Por favor, espera unos minutos.".to_string()
            }
            SessionError::Forbidden => "Tu cuenta no tiene acceso a esta sección.".to_string(),
            SessionError::Network(_) | SessionError::Unavailable => {
                "No se pudo conectar con el servidor. Intenta de nuevo más tarde.".to_string()
            }
            SessionError::Server(_) | SessionError::Storage(_) => {
                "Ha ocurrido un error inesperado".to_string()
            }
        }
    }
}

/// Remote side of the session: the `/auth` endpoints of the API.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<SignedIn, SessionError>;
    async fn verify(&self, token: &str) -> Result<SessionUser, SessionError>;
    async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SessionUser, SessionError>;
}

/// Where the bearer token is persisted between runs.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, SessionError>;
    fn save(&self, token: &str) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: std::sync::Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self { token: std::sync::Mutex::new(Some(token.into())) }
    }

    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>, SessionError> {
        self.token.lock().map_err(|_| SessionError::Storage("token lock poisoned".to_string()))
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, SessionError> {
        Ok(self.slot()?.clone())
    }

    fn save(&self, token: &str) -> Result<(), SessionError> {
        *self.slot()? = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.slot()? = None;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user: Option<SessionUser>,
    pub loading: bool,
    pub initialized: bool,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self { user: None, loading: true, initialized: false }
    }
}

#[derive(Debug, Validate)]
struct Credentials {
    #[validate(email(message = "Correo electrónico inválido"))]
    email: String,
    #[validate(length(min = 1, message = "La contraseña es obligatoria"))]
    password: String,
}

#[derive(Debug, Validate)]
struct Registration {
    #[validate(email(message = "Correo electrónico inválido"))]
    email: String,
    #[validate(length(min = 6, message = "La contraseña debe tener al menos 6 caracteres"))]
    password: String,
    #[validate(length(min = 2, message = "El nombre debe tener al menos 2 caracteres"))]
    full_name: String,
}

fn first_message(errors: validator::ValidationErrors) -> SessionError {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    let message = fields
        .into_iter()
        .flat_map(|(_, errors)| errors.iter())
        .find_map(|error| error.message.as_ref().map(|message| message.to_string()))
        .unwrap_or_else(|| "Datos inválidos".to_string());
    SessionError::Validation(message)
}

pub struct SessionStore {
    backend: Arc<dyn AuthBackend>,
    tokens: Arc<dyn TokenStore>,
    state: RwLock<SessionSnapshot>,
    init_lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn AuthBackend>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            backend,
            tokens,
            state: RwLock::new(SessionSnapshot::default()),
            init_lock: Mutex::new(()),
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.read().await.clone()
    }

    pub async fn user(&self) -> Option<SessionUser> {
        self.state.read().await.user.clone()
    }

    /// Restores the session from a stored token. Runs once; later calls
    /// return immediately. A token the API no longer accepts is discarded.
    pub async fn initialize(&self) {
        let _init = self.init_lock.lock().await;
        if self.state.read().await.initialized {
            return;
        }

        let token = match self.tokens.load() {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read stored session token");
                None
            }
        };

        let user = match token {
            None => None,
            Some(token) => match self.backend.verify(&token).await {
                Ok(user) => Some(user),
                Err(err) => {
                    tracing::info!(error = %err, "Stored session token rejected; signing out");
                    if let Err(err) = self.tokens.clear() {
                        tracing::warn!(error = %err, "Failed to clear stored session token");
                    }
                    None
                }
            },
        };

        let mut state = self.state.write().await;
        state.user = user;
        state.loading = false;
        state.initialized = true;
    }

    /// Signs in with email and password. Input is checked locally before
    /// any request is made; on failure the current session is left as is.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionUser, SessionError> {
        let email = email.trim();
        Credentials { email: email.to_string(), password: password.to_string() }
            .validate()
            .map_err(first_message)?;

        let signed_in = self.backend.login(email, password).await?;
        self.tokens.save(&signed_in.token)?;

        let mut state = self.state.write().await;
        state.user = Some(signed_in.user.clone());
        state.loading = false;
        state.initialized = true;
        tracing::info!(user_id = %signed_in.user.id, role = ?signed_in.user.role, "Signed in");
        Ok(signed_in.user)
    }

    /// Creates an account. The caller still has to sign in afterwards.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SessionUser, SessionError> {
        let email = email.trim();
        let full_name = full_name.trim();
        Registration {
            email: email.to_string(),
            password: password.to_string(),
            full_name: full_name.to_string(),
        }
        .validate()
        .map_err(first_message)?;
        self.backend.register(email, password, full_name).await
    }

    pub async fn sign_out(&self) {
        if let Err(err) = self.tokens.clear() {
            tracing::warn!(error = %err, "Failed to clear stored session token");
        }
        self.state.write().await.user = None;
    }

    /// Dashboard the current user lands on after signing in.
    pub async fn home_path(&self) -> &'static str {
        let role = self.state.read().await.user.as_ref().map(|user| user.role);
        route_guard::home_path(role)
    }
}

#[cfg(test)]
mod tests;
