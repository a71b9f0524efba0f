use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Built once at startup and passed into constructors.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub storage: StorageConfig,
    /// When absent the AI collaborator is disabled and heuristic structuring is used.
    pub anthropic_api_key: Option<String>,
    /// Per-attempt AI collaborator timeout.
    pub llm_timeout: Duration,
    /// Largest accepted upload request body.
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    ObjectStore,
    Filesystem,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::ObjectStore => "s3",
            BackendKind::Filesystem => "filesystem",
        }
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "s3" | "object-store" => Ok(BackendKind::ObjectStore),
            "filesystem" | "fs" => Ok(BackendKind::Filesystem),
            other => bail!("unknown storage backend '{other}' (expected 's3' or 'filesystem')"),
        }
    }
}

/// Storage settings shared by both backends.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub primary: BackendKind,
    pub fallback: Option<BackendKind>,
    pub cache_dir: PathBuf,
    /// Required only when an object store backend is selected.
    pub s3: Option<S3Settings>,
    /// Upper bound for a single backend call.
    pub timeout: Duration,
    pub max_attempts: u32,
}

#[derive(Clone)]
pub struct S3Settings {
    pub bucket: String,
    /// Custom endpoint for MinIO; `None` targets AWS.
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Settings")
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let primary: BackendKind = var("STORAGE_PRIMARY")
            .as_deref()
            .unwrap_or("filesystem")
            .parse()
            .context("STORAGE_PRIMARY is invalid")?;
        let fallback = match var("STORAGE_FALLBACK").as_deref() {
            None | Some("none") => None,
            Some(value) => Some(
                value
                    .parse::<BackendKind>()
                    .context("STORAGE_FALLBACK is invalid")?,
            ),
        };
        if fallback == Some(primary) {
            bail!("STORAGE_FALLBACK must differ from STORAGE_PRIMARY");
        }

        let uses_s3 =
            primary == BackendKind::ObjectStore || fallback == Some(BackendKind::ObjectStore);
        let s3 = if uses_s3 {
            let require = |key: &str| {
                var(key).with_context(|| {
                    format!("Required environment variable '{key}' is not set")
                })
            };
            Some(S3Settings {
                bucket: require("S3_BUCKET")?,
                endpoint: var("S3_ENDPOINT"),
                region: var("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                access_key_id: require("AWS_ACCESS_KEY_ID")?,
                secret_access_key: require("AWS_SECRET_ACCESS_KEY")?,
            })
        } else {
            None
        };

        let storage = StorageConfig {
            primary,
            fallback,
            cache_dir: var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./.folio-cache")),
            s3,
            timeout: Duration::from_millis(parse_or(&var, "BACKEND_TIMEOUT_MS", 5000)?),
            max_attempts: parse_or(&var, "BACKEND_MAX_ATTEMPTS", 3)?,
        };
        if storage.max_attempts == 0 {
            bail!("BACKEND_MAX_ATTEMPTS must be at least 1");
        }

        Ok(Config {
            port: parse_or(&var, "PORT", 8080)?,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            storage,
            anthropic_api_key: var("ANTHROPIC_API_KEY"),
            llm_timeout: Duration::from_secs(parse_or(&var, "LLM_TIMEOUT_SECS", 60)?),
            max_upload_bytes: parse_or(&var, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a valid number")),
        None => Ok(default),
    }
}
