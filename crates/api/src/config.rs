use sonogen_core::retention::{DEFAULT_RETENTION_DAYS, DEFAULT_VARIANT_COUNT, MAX_VARIANT_COUNT};

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development. In production,
/// override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// HMAC key shared with the generation worker and the payment provider.
    pub worker_callback_secret: String,
    pub storage: StorageConfig,
    /// Style variants attempted per job.
    pub variant_count: i16,
    /// Days until an uploaded job expires.
    pub retention_days: i64,
    /// Interval between expiry sweeps.
    pub retention_sweep_secs: u64,
}

/// Settings for the signed-URL issuer.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub public_url: String,
    pub signing_secret: String,
    pub signed_url_ttl_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                         |
    /// |--------------------------|---------------------------------|
    /// | `HOST`                   | `0.0.0.0`                       |
    /// | `PORT`                   | `3000`                          |
    /// | `CORS_ORIGINS`           | `http://localhost:5173`         |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                            |
    /// | `WORKER_CALLBACK_SECRET` | `dev-worker-secret`             |
    /// | `STORAGE_PUBLIC_URL`     | `http://localhost:9000/sonogen` |
    /// | `STORAGE_SIGNING_SECRET` | `dev-storage-secret`            |
    /// | `SIGNED_URL_TTL_SECS`    | `900`                           |
    /// | `VARIANT_COUNT`          | `4`                             |
    /// | `RETENTION_DAYS`         | `30`                            |
    /// | `RETENTION_SWEEP_SECS`   | `3600`                          |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let worker_callback_secret = std::env::var("WORKER_CALLBACK_SECRET")
            .unwrap_or_else(|_| "dev-worker-secret".into());

        let storage = StorageConfig {
            public_url: std::env::var("STORAGE_PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:9000/sonogen".into()),
            signing_secret: std::env::var("STORAGE_SIGNING_SECRET")
                .unwrap_or_else(|_| "dev-storage-secret".into()),
            signed_url_ttl_secs: std::env::var("SIGNED_URL_TTL_SECS")
                .unwrap_or_else(|_| "900".into())
                .parse()
                .expect("SIGNED_URL_TTL_SECS must be a valid u64"),
        };

        let variant_count: i16 = std::env::var("VARIANT_COUNT")
            .unwrap_or_else(|_| DEFAULT_VARIANT_COUNT.to_string())
            .parse()
            .expect("VARIANT_COUNT must be a valid i16");
        assert!(
            (1..=MAX_VARIANT_COUNT).contains(&variant_count),
            "VARIANT_COUNT must be between 1 and {MAX_VARIANT_COUNT}"
        );

        let retention_days: i64 = std::env::var("RETENTION_DAYS")
            .unwrap_or_else(|_| DEFAULT_RETENTION_DAYS.to_string())
            .parse()
            .expect("RETENTION_DAYS must be a valid i64");

        let retention_sweep_secs: u64 = std::env::var("RETENTION_SWEEP_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .expect("RETENTION_SWEEP_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            worker_callback_secret,
            storage,
            variant_count,
            retention_days,
            retention_sweep_secs,
        }
    }
}
