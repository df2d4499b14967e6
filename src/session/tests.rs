use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::*;
use crate::test_support;

struct FakeBackend {
    user: SessionUser,
    password: &'static str,
    valid_token: &'static str,
    calls: AtomicUsize,
}

impl FakeBackend {
    fn new(role: UserRole) -> Self {
        Self {
            user: SessionUser {
                id: "user-1".to_string(),
                email: "ana@example.com".to_string(),
                full_name: "Ana".to_string(),
                role,
                is_active: true,
                avatar_url: None,
                subscription_status: SubscriptionStatus::Free,
                subscription_expires_at: None,
            },
            password: "secreto-123",
            valid_token: "good-token",
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthBackend for FakeBackend {
    async fn login(&self, email: &str, password: &str) -> Result<SignedIn, SessionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if email == self.user.email && password == self.password {
            Ok(SignedIn { token: self.valid_token.to_string(), user: self.user.clone() })
        } else {
            Err(SessionError::Unauthorized)
        }
    }

    async fn verify(&self, token: &str) -> Result<SessionUser, SessionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if token == self.valid_token {
            Ok(self.user.clone())
        } else {
            Err(SessionError::Unauthorized)
        }
    }

    async fn register(
        &self,
        email: &str,
        _password: &str,
        full_name: &str,
    ) -> Result<SessionUser, SessionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if email == self.user.email {
            return Err(SessionError::Conflict);
        }
        Ok(SessionUser {
            id: "user-2".to_string(),
            email: email.to_string(),
            full_name: full_name.to_string(),
            role: UserRole::Student,
            ..self.user.clone()
        })
    }
}

fn store_with(backend: &Arc<FakeBackend>, tokens: &Arc<MemoryTokenStore>) -> SessionStore {
    SessionStore::new(backend.clone(), tokens.clone())
}

#[tokio::test]
async fn starts_loading_and_settles_without_a_token() {
    let backend = Arc::new(FakeBackend::new(UserRole::Student));
    let tokens = Arc::new(MemoryTokenStore::new());
    let store = store_with(&backend, &tokens);

    let before = store.snapshot().await;
    assert!(before.loading);
    assert!(!before.initialized);

    store.initialize().await;
    let after = store.snapshot().await;
    assert_eq!(after, SessionSnapshot { user: None, loading: false, initialized: true });
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn initialize_restores_the_user_once() {
    let backend = Arc::new(FakeBackend::new(UserRole::Teacher));
    let tokens = Arc::new(MemoryTokenStore::with_token("good-token"));
    let store = store_with(&backend, &tokens);

    store.initialize().await;
    store.initialize().await;

    assert_eq!(backend.calls(), 1);
    assert_eq!(store.user().await.map(|user| user.role), Some(UserRole::Teacher));
    assert_eq!(store.home_path().await, "/dashboard/teacher");
}

#[tokio::test]
async fn rejected_token_is_cleared() {
    let backend = Arc::new(FakeBackend::new(UserRole::Student));
    let tokens = Arc::new(MemoryTokenStore::with_token("stale-token"));
    let store = store_with(&backend, &tokens);

    store.initialize().await;

    let snapshot = store.snapshot().await;
    assert!(snapshot.user.is_none());
    assert!(snapshot.initialized);
    assert!(!snapshot.loading);
    assert_eq!(tokens.load().expect("load"), None);
}

#[tokio::test]
async fn failed_sign_in_leaves_the_session_untouched() {
    let backend = Arc::new(FakeBackend::new(UserRole::Student));
    let tokens = Arc::new(MemoryTokenStore::new());
    let store = store_with(&backend, &tokens);
    store.initialize().await;

    let err = store.sign_in("ana@example.com", "wrong-password").await.expect_err("rejected");
    assert_eq!(err, SessionError::Unauthorized);
    assert!(!err.user_message().is_empty());
    assert!(store.user().await.is_none());
    assert_eq!(tokens.load().expect("load"), None);
}

#[tokio::test]
async fn malformed_input_never_reaches_the_backend() {
    let backend = Arc::new(FakeBackend::new(UserRole::Student));
    let tokens = Arc::new(MemoryTokenStore::new());
    let store = store_with(&backend, &tokens);

    let err = store.sign_in("not-an-email", "secreto-123").await.expect_err("invalid");
    assert_eq!(err.user_message(), "Correo electrónico inválido");

    let err = store.sign_in("ana@example.com", "").await.expect_err("missing");
    assert_eq!(err.user_message(), "La contraseña es obligatoria");

    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn short_passwords_are_checked_by_the_backend() {
    let backend = Arc::new(FakeBackend::new(UserRole::Admin));
    let tokens = Arc::new(MemoryTokenStore::new());
    let store = store_with(&backend, &tokens);

    let err = store.sign_in("ana@example.com", "123").await.expect_err("rejected");
    assert_eq!(err, SessionError::Unauthorized);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn sign_in_then_sign_out() {
    let backend = Arc::new(FakeBackend::new(UserRole::Student));
    let tokens = Arc::new(MemoryTokenStore::new());
    let store = store_with(&backend, &tokens);
    store.initialize().await;

    let user = store.sign_in(" ana@example.com ", "secreto-123").await.expect("signed in");
    assert_eq!(user.role, UserRole::Student);
    assert_eq!(tokens.load().expect("load").as_deref(), Some("good-token"));
    assert_eq!(store.home_path().await, "/dashboard/student");

    store.sign_out().await;
    assert!(store.user().await.is_none());
    assert_eq!(tokens.load().expect("load"), None);
}

#[tokio::test]
async fn sign_up_does_not_sign_in() {
    let backend = Arc::new(FakeBackend::new(UserRole::Student));
    let tokens = Arc::new(MemoryTokenStore::new());
    let store = store_with(&backend, &tokens);

    let created =
        store.sign_up("luis@example.com", "secreto-123", "Luis").await.expect("registered");
    assert_eq!(created.email, "luis@example.com");
    assert!(store.user().await.is_none());
    assert_eq!(tokens.load().expect("load"), None);

    let err = store.sign_up("ana@example.com", "secreto-123", "Ana").await.expect_err("taken");
    assert_eq!(err.user_message(), "Este correo electrónico ya está registrado.");

    let err = store.sign_up("luis@example.com", "secreto-123", "L").await.expect_err("short");
    assert_eq!(err.user_message(), "El nombre debe tener al menos 2 caracteres");
}

#[tokio::test]
async fn http_backend_signs_in_against_the_api() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };
    let teacher =
        test_support::insert_user(ctx.state.db(), "maestra@example.com", UserRole::Teacher).await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = ctx.app.clone();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let backend = HttpAuthBackend::new(&format!("http://{addr}/api")).expect("backend");
    let tokens = Arc::new(MemoryTokenStore::new());
    let store = SessionStore::new(Arc::new(backend.clone()), tokens.clone());

    let err = store.sign_in(&teacher.email, "otra-clave-999").await.expect_err("wrong password");
    assert_eq!(err, SessionError::Unauthorized);

    let user = store.sign_in(&teacher.email, test_support::TEST_PASSWORD).await.expect("login");
    assert_eq!(user.id, teacher.id);
    assert_eq!(store.home_path().await, "/dashboard/teacher");

    let restored = SessionStore::new(Arc::new(backend), tokens.clone());
    restored.initialize().await;
    assert_eq!(restored.user().await.map(|user| user.id), Some(teacher.id));
}
