use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::{cmd, Client, RedisError};
use tokio::sync::RwLock;

const RATE_LIMIT_SCRIPT: &str = r#"
    local current = redis.call("INCR", KEYS[1])
    if current == 1 then
        redis.call("EXPIRE", KEYS[1], ARGV[1])
    end
    return current
"#;

/// Fixed-window limit: at most `max_attempts` per `window_seconds`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RateLimit {
    pub(crate) max_attempts: u64,
    pub(crate) window_seconds: u64,
}

pub(crate) const AUTH_RATE_LIMIT: RateLimit = RateLimit { max_attempts: 10, window_seconds: 60 };
pub(crate) const CONTACT_RATE_LIMIT: RateLimit =
    RateLimit { max_attempts: 5, window_seconds: 600 };

/// Shared Redis connection. Absent or failing Redis never blocks requests.
#[derive(Clone)]
pub(crate) struct RedisHandle {
    url: String,
    manager: Arc<RwLock<Option<ConnectionManager>>>,
}

#[derive(Debug, Clone)]
pub(crate) enum RedisHealth {
    Healthy,
    Disconnected,
    Unhealthy(String),
}

impl RedisHandle {
    pub(crate) fn new(url: String) -> Self {
        Self { url, manager: Arc::new(RwLock::new(None)) }
    }

    pub(crate) async fn connect(&self) -> Result<(), RedisError> {
        let client = Client::open(self.url.clone())?;
        let manager = ConnectionManager::new(client).await?;
        *self.manager.write().await = Some(manager);
        Ok(())
    }

    pub(crate) async fn health(&self) -> RedisHealth {
        let manager = { self.manager.read().await.clone() };
        let Some(mut manager) = manager else {
            return RedisHealth::Disconnected;
        };

        match cmd("PING").query_async::<_, String>(&mut manager).await {
            Ok(_) => RedisHealth::Healthy,
            Err(err) => RedisHealth::Unhealthy(err.to_string()),
        }
    }

    /// Counts one attempt for `scope:subject` and reports whether it is
    /// within `rule`. Returns `true` when Redis is unavailable.
    pub(crate) async fn allow(&self, scope: &str, subject: &str, rule: RateLimit) -> bool {
        let key = rate_limit_key(scope, subject);
        match self.incr_window(&key, rule.window_seconds).await {
            Ok(Some(current)) => current <= rule.max_attempts as i64,
            Ok(None) => true,
            Err(error) => {
                tracing::warn!(error = %error, key = %key, "Rate limit check failed; allowing");
                true
            }
        }
    }

    async fn incr_window(&self, key: &str, window_seconds: u64) -> Result<Option<i64>, RedisError> {
        let manager = { self.manager.read().await.clone() };
        let Some(mut manager) = manager else {
            return Ok(None);
        };

        let current: i64 = redis::Script::new(RATE_LIMIT_SCRIPT)
            .key(key)
            .arg(window_seconds as i64)
            .invoke_async(&mut manager)
            .await?;
        Ok(Some(current))
    }
}

pub(crate) fn rate_limit_key(scope: &str, subject: &str) -> String {
    format!("rl:{scope}:{}", subject.trim().to_lowercase())
}
