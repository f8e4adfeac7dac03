//! Configuration module
//!
//! All settings come from the environment (optionally seeded from a `.env` file).
//! The deployment environment gates token enforcement and media routing; the
//! store settings are only required when running in production.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const SERVER_PORT: u16 = 4000;
const STORE_TIMEOUT_SECS: u64 = 30;
const HTTP_CLIENT_TIMEOUT_SECS: u64 = 15;
const REQUEST_TIMEOUT_SECS: u64 = 60;
const MAX_UPLOAD_SIZE_MB: usize = 50;
const DEFAULT_TOKEN_ENDPOINT: &str = "https://tokens.indieauth.com/token";

/// Deployment environment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Production,
    Development,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Development => "development",
        }
    }
}

/// What the media pipeline does when the CDN mirror write fails after the
/// canonical write succeeded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MirrorFailurePolicy {
    /// Surface the mirror failure to the caller.
    Fail,
    /// Log the failure and return the media URL anyway.
    Degrade,
}

impl FromStr for MirrorFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail" => Ok(MirrorFailurePolicy::Fail),
            "degrade" => Ok(MirrorFailurePolicy::Degrade),
            other => Err(anyhow::anyhow!(
                "MIRROR_FAILURE_POLICY must be 'fail' or 'degrade', got '{}'",
                other
            )),
        }
    }
}

/// SMTP settings for failure notifications
#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub tls: bool,
    pub recipients: Vec<String>,
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: Environment,
    pub server_port: u16,
    /// Public root URL of the site, e.g. `https://example.com/`
    pub root_url: String,
    /// Base URL media paths are joined onto, e.g. `https://media.example.com/`
    pub media_url: String,
    /// Root of local content (posts and media) outside production
    pub content_dir: PathBuf,
    /// Directory holding `syndication_targets.json`
    pub config_dir: PathBuf,
    pub token_endpoint: String,
    // Canonical store (GitHub repository)
    pub github_access_token: Option<String>,
    pub github_repo: Option<String>,
    pub github_branch: String,
    // CDN mirror (S3-compatible)
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub mirror_failure_policy: MirrorFailurePolicy,
    pub store_timeout_secs: u64,
    pub http_client_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_upload_size_bytes: usize,
    pub smtp: Option<SmtpConfig>,
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = Environment::parse(
            &env::var("ENVIRONMENT")
                .or_else(|_| env::var("APP_ENV"))
                .unwrap_or_else(|_| "development".to_string()),
        );

        let mirror_failure_policy = env::var("MIRROR_FAILURE_POLICY")
            .unwrap_or_else(|_| "fail".to_string())
            .parse()?;

        let config = Config {
            environment,
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            root_url: env::var("ROOT_URL")
                .map_err(|_| anyhow::anyhow!("ROOT_URL must be set"))?,
            media_url: env::var("MEDIA_URL")
                .map_err(|_| anyhow::anyhow!("MEDIA_URL must be set"))?,
            content_dir: env::var("CONTENT_DIR")
                .unwrap_or_else(|_| "./content".to_string())
                .into(),
            config_dir: env::var("CONFIG_DIR")
                .unwrap_or_else(|_| "./config".to_string())
                .into(),
            token_endpoint: env::var("TOKEN_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_TOKEN_ENDPOINT.to_string()),
            github_access_token: env::var("GITHUB_ACCESS_TOKEN")
                .ok()
                .filter(|s| !s.is_empty()),
            github_repo: env::var("GITHUB_REPO").ok().filter(|s| !s.is_empty()),
            github_branch: env::var("GITHUB_BRANCH").unwrap_or_else(|_| "main".to_string()),
            s3_bucket: env::var("S3_BUCKET").ok().filter(|s| !s.is_empty()),
            s3_region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .ok()
                .filter(|s| !s.is_empty()),
            s3_endpoint: env::var("S3_ENDPOINT").ok().filter(|s| !s.is_empty()),
            mirror_failure_policy,
            store_timeout_secs: env::var("STORE_TIMEOUT_SECS")
                .unwrap_or_else(|_| STORE_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(STORE_TIMEOUT_SECS),
            http_client_timeout_secs: env::var("HTTP_CLIENT_TIMEOUT_SECS")
                .unwrap_or_else(|_| HTTP_CLIENT_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(HTTP_CLIENT_TIMEOUT_SECS),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| REQUEST_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(REQUEST_TIMEOUT_SECS),
            max_upload_size_bytes: env::var("MAX_UPLOAD_SIZE_MB")
                .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
                .parse::<usize>()
                .unwrap_or(MAX_UPLOAD_SIZE_MB)
                * 1024
                * 1024,
            smtp: smtp_from_env(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        url::Url::parse(&self.root_url)
            .map_err(|e| anyhow::anyhow!("ROOT_URL must be an absolute URL: {}", e))?;
        url::Url::parse(&self.media_url)
            .map_err(|e| anyhow::anyhow!("MEDIA_URL must be an absolute URL: {}", e))?;

        if self.store_timeout_secs == 0 {
            return Err(anyhow::anyhow!("STORE_TIMEOUT_SECS must be greater than 0"));
        }

        if self.is_production() {
            if self.github_repo.is_none() || self.github_access_token.is_none() {
                return Err(anyhow::anyhow!(
                    "GITHUB_REPO and GITHUB_ACCESS_TOKEN must be set in production"
                ));
            }
            if let Some(repo) = &self.github_repo {
                if repo.split('/').filter(|s| !s.is_empty()).count() != 2 {
                    return Err(anyhow::anyhow!("GITHUB_REPO must look like 'owner/name'"));
                }
            }
            if self.s3_bucket.is_none() {
                return Err(anyhow::anyhow!("S3_BUCKET must be set in production"));
            }
            if self.s3_region.is_none() {
                return Err(anyhow::anyhow!(
                    "S3_REGION or AWS_REGION must be set in production"
                ));
            }
        }

        Ok(())
    }

    /// Root URL without a trailing slash, for comparisons and URL building.
    pub fn root_url_trimmed(&self) -> &str {
        self.root_url.trim_end_matches('/')
    }

    pub fn syndication_targets_path(&self) -> PathBuf {
        self.config_dir
            .join(crate::constants::SYNDICATION_TARGETS_FILE)
    }
}

fn smtp_from_env() -> Option<SmtpConfig> {
    let host = env::var("SMTP_HOST").ok().filter(|s| !s.is_empty())?;
    let from = env::var("SMTP_FROM").ok().filter(|s| !s.is_empty())?;
    let recipients: Vec<String> = env::var("NOTIFY_EMAIL_TO")
        .ok()?
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if recipients.is_empty() {
        return None;
    }

    Some(SmtpConfig {
        host,
        port: env::var("SMTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&p| p > 0)
            .unwrap_or(587),
        user: env::var("SMTP_USER").ok().filter(|s| !s.is_empty()),
        password: env::var("SMTP_PASSWORD").ok().filter(|s| !s.is_empty()),
        from,
        tls: env::var("SMTP_TLS")
            .unwrap_or_else(|_| "true".to_string())
            .to_lowercase()
            .parse()
            .unwrap_or(true),
        recipients,
    })
}
