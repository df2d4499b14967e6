use std::{env, fs, io::Write, path::PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "https://clubpoliglota.com",
    "https://www.clubpoliglota.com",
    "https://club-poliglota.onrender.com",
];

const DEFAULT_SUBMISSION_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "jpg", "jpeg", "png", "mp3"];

/// Process configuration, read once from the environment (and `.env`).
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    server: ServerSettings,
    runtime: RuntimeSettings,
    api: ApiSettings,
    security: SecuritySettings,
    cors: CorsSettings,
    database: DatabaseSettings,
    redis: RedisSettings,
    storage: StorageSettings,
    s3: S3Settings,
    contact: ContactSettings,
    admin: AdminSettings,
    telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
struct ServerSettings {
    host: String,
    port: u16,
}

#[derive(Debug, Clone)]
pub(crate) struct ApiSettings {
    pub(crate) project_name: String,
    pub(crate) version: String,
    pub(crate) api_prefix: String,
}

#[derive(Debug, Clone)]
pub(crate) struct SecuritySettings {
    pub(crate) secret_key: String,
    pub(crate) access_token_expire_minutes: u64,
    pub(crate) algorithm: String,
}

#[derive(Debug, Clone)]
pub(crate) struct CorsSettings {
    pub(crate) origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct DatabaseSettings {
    url: String,
    has_password: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct RedisSettings {
    url: String,
}

/// Limits for activity submission files.
#[derive(Debug, Clone)]
pub(crate) struct StorageSettings {
    pub(crate) max_upload_size_mb: u64,
    pub(crate) allowed_submission_extensions: Vec<String>,
    pub(crate) signed_url_expire_minutes: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct S3Settings {
    pub(crate) endpoint: String,
    pub(crate) access_key: String,
    pub(crate) secret_key: String,
    pub(crate) bucket: String,
    pub(crate) region: String,
}

/// Where contact-form messages are routed.
#[derive(Debug, Clone)]
pub(crate) struct ContactSettings {
    pub(crate) email: String,
    pub(crate) whatsapp_number: String,
}

#[derive(Debug, Clone)]
pub(crate) struct AdminSettings {
    pub(crate) first_admin_email: String,
    pub(crate) first_admin_password: String,
}

#[derive(Debug, Clone)]
pub(crate) struct TelemetrySettings {
    pub(crate) log_level: String,
    pub(crate) json: bool,
    pub(crate) prometheus_enabled: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct RuntimeSettings {
    pub(crate) environment: Environment,
    pub(crate) strict_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Environment {
    Development,
    Production,
    Staging,
    Test,
}

impl Environment {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Test => "test",
        }
    }

    fn parse(value: Option<&str>) -> Self {
        match value.map(str::to_lowercase).as_deref() {
            Some("production" | "prod") => Environment::Production,
            Some("staging") => Environment::Staging,
            Some("test" | "testing") => Environment::Test,
            _ => Environment::Development,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("invalid server host: {0}")]
    InvalidHost(String),
    #[error("invalid server port: {0}")]
    InvalidPort(String),
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("invalid cors origins: {0}")]
    InvalidCors(String),
    #[error("missing required secret for {0}")]
    MissingSecret(&'static str),
}

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let runtime = RuntimeSettings::from_env();
        let settings = Self {
            server: ServerSettings::from_env()?,
            api: ApiSettings::from_env(),
            security: SecuritySettings::from_env(runtime.strict_config)?,
            cors: CorsSettings {
                origins: parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?,
            },
            database: DatabaseSettings::from_env()?,
            redis: RedisSettings::from_env()?,
            storage: StorageSettings::from_env()?,
            s3: S3Settings::from_env(),
            contact: ContactSettings::from_env()?,
            admin: AdminSettings {
                first_admin_email: env_or_default("FIRST_ADMIN_EMAIL", "admin@clubpoliglota.com"),
                first_admin_password: env_or_default("FIRST_ADMIN_PASSWORD", ""),
            },
            telemetry: TelemetrySettings {
                log_level: env_or_default("POLIGLOTA_LOG_LEVEL", "info"),
                json: env_flag("POLIGLOTA_LOG_JSON"),
                prometheus_enabled: env_flag("PROMETHEUS_ENABLED"),
            },
            runtime,
        };

        if settings.runtime.strict_config {
            settings.require_secrets()?;
        }
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    pub(crate) fn s3(&self) -> &S3Settings {
        &self.s3
    }

    pub(crate) fn contact(&self) -> &ContactSettings {
        &self.contact
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    /// Production deployments must not fall back to empty credentials.
    fn require_secrets(&self) -> Result<(), ConfigError> {
        if !self.database.has_password {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.s3.access_key.is_empty() || self.s3.secret_key.is_empty() {
            return Err(ConfigError::MissingSecret("S3_ACCESS_KEY/S3_SECRET_KEY"));
        }
        if self.admin.first_admin_password.is_empty() {
            return Err(ConfigError::MissingSecret("FIRST_ADMIN_PASSWORD"));
        }
        Ok(())
    }
}

impl RuntimeSettings {
    fn from_env() -> Self {
        let environment = Environment::parse(
            env_optional("POLIGLOTA_ENV").or_else(|| env_optional("ENVIRONMENT")).as_deref(),
        );
        let strict_config =
            env_flag("POLIGLOTA_STRICT_CONFIG") || environment == Environment::Production;
        Self { environment, strict_config }
    }
}

impl ServerSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let host = env_or_default("POLIGLOTA_HOST", "0.0.0.0");
        let raw_port = env_or_default("POLIGLOTA_PORT", "8000");
        let port = match raw_port.parse::<u16>() {
            Ok(port) if port > 0 => port,
            _ => return Err(ConfigError::InvalidPort(raw_port)),
        };
        if host.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidHost(host));
        }
        Ok(Self { host, port })
    }
}

impl ApiSettings {
    fn from_env() -> Self {
        Self {
            project_name: env_or_default("PROJECT_NAME", "Club Políglota API"),
            version: env_or_default("VERSION", env!("CARGO_PKG_VERSION")),
            api_prefix: normalize_prefix(&env_or_default("API_PREFIX", "/api")),
        }
    }
}

impl SecuritySettings {
    fn from_env(strict: bool) -> Result<Self, ConfigError> {
        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None if strict => return Err(ConfigError::MissingSecret("SECRET_KEY")),
            None => local_secret_key(),
        };
        Ok(Self {
            secret_key,
            access_token_expire_minutes: env_number("ACCESS_TOKEN_EXPIRE_MINUTES", 1440)?,
            algorithm: env_or_default("ALGORITHM", "HS256"),
        })
    }
}

impl DatabaseSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let password = env_or_default("POSTGRES_PASSWORD", "");
        if let Some(url) = env_optional("DATABASE_URL") {
            return Ok(Self { url, has_password: true });
        }

        let url = format!(
            "postgresql://{}:{}@{}:{}/{}",
            env_or_default("POSTGRES_USER", "poliglota"),
            password,
            env_or_default("POSTGRES_SERVER", "localhost"),
            env_number::<u16>("POSTGRES_PORT", 5432)?,
            env_or_default("POSTGRES_DB", "poliglota_db"),
        );
        Ok(Self { url, has_password: !password.is_empty() })
    }

    pub(crate) fn database_url(&self) -> String {
        self.url.clone()
    }
}

impl RedisSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let host = env_or_default("REDIS_HOST", "localhost");
        let port = env_number::<u16>("REDIS_PORT", 6379)?;
        let db = env_number::<u16>("REDIS_DB", 0)?;
        let url = match env_optional("REDIS_PASSWORD") {
            Some(password) => format!("redis://:{password}@{host}:{port}/{db}"),
            None => format!("redis://{host}:{port}/{db}"),
        };
        Ok(Self { url })
    }

    pub(crate) fn redis_url(&self) -> String {
        self.url.clone()
    }
}

impl StorageSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let max_upload_size_mb = env_number("MAX_UPLOAD_SIZE_MB", 10)?;
        if max_upload_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MAX_UPLOAD_SIZE_MB",
                value: "0".to_string(),
            });
        }

        let allowed_submission_extensions = match env_optional("ALLOWED_SUBMISSION_EXTENSIONS") {
            Some(raw) => parse_extensions(&raw),
            None => DEFAULT_SUBMISSION_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        };
        if allowed_submission_extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ALLOWED_SUBMISSION_EXTENSIONS",
                value: "<empty>".to_string(),
            });
        }

        Ok(Self {
            max_upload_size_mb,
            allowed_submission_extensions,
            signed_url_expire_minutes: env_number("SIGNED_URL_EXPIRE_MINUTES", 60)?,
        })
    }
}

impl S3Settings {
    fn from_env() -> Self {
        Self {
            endpoint: env_or_default("S3_ENDPOINT", "http://localhost:9000"),
            access_key: env_or_default("S3_ACCESS_KEY", ""),
            secret_key: env_or_default("S3_SECRET_KEY", ""),
            bucket: env_or_default("S3_BUCKET", "activity-submissions"),
            region: env_or_default("S3_REGION", "us-east-1"),
        }
    }
}

impl ContactSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let whatsapp_number = env_or_default("CONTACT_WHATSAPP", "6143977741");
        if !whatsapp_number.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(ConfigError::InvalidValue {
                field: "CONTACT_WHATSAPP",
                value: whatsapp_number,
            });
        }
        let email = env_or_default("CONTACT_EMAIL", "clubpoliglotamx@gmail.com");
        Ok(Self { email, whatsapp_number })
    }
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

fn env_flag(key: &str) -> bool {
    env_optional(key).is_some_and(|value| parse_bool(&value))
}

fn env_number<T: std::str::FromStr>(field: &'static str, default: T) -> Result<T, ConfigError> {
    match env_optional(field) {
        Some(value) => value.parse::<T>().map_err(|_| ConfigError::InvalidValue { field, value }),
        None => Ok(default),
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn normalize_prefix(raw: &str) -> String {
    match raw.trim().trim_matches('/') {
        "" => "/api".to_string(),
        path => format!("/{path}"),
    }
}

/// Accepts either a JSON array or a comma-separated list.
fn parse_cors_origins(value: Option<String>) -> Result<Vec<String>, ConfigError> {
    let origins = match value {
        Some(raw) if raw.starts_with('[') => {
            serde_json::from_str::<Vec<String>>(&raw).map_err(|_| ConfigError::InvalidCors(raw))?
        }
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    };

    if origins.is_empty() {
        return Ok(DEFAULT_CORS_ORIGINS.iter().map(|origin| origin.to_string()).collect());
    }
    Ok(origins)
}

fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Development fallback: a random key persisted next to the manifest so
/// tokens survive restarts.
fn local_secret_key() -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(".secret_key");
    if let Some(existing) = fs::read_to_string(&path).ok().filter(|key| !key.trim().is_empty()) {
        return existing.trim().to_string();
    }

    let mut bytes = [0u8; 64];
    OsRng.fill_bytes(&mut bytes);
    let key = URL_SAFE_NO_PAD.encode(bytes);

    let written = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .and_then(|mut file| {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                file.set_permissions(fs::Permissions::from_mode(0o600))?;
            }
            file.write_all(key.as_bytes())
        });

    match written {
        Ok(()) => key,
        // Another process won the race; use its key.
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
            fs::read_to_string(&path).map(|key| key.trim().to_string()).unwrap_or(key)
        }
        Err(err) => {
            tracing::warn!(error = %err, path = %path.display(), "Failed to persist secret key");
            key
        }
    }
}
