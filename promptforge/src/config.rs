//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `PROMPTFORGE_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `PROMPTFORGE_` override YAML values
//! 3. **DATABASE_URL** - Special case: overrides `database.url` if set
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `PROMPTFORGE_PROVIDERS__PAID__API_KEY=...` sets the `providers.paid.api_key` field.

use clap::Parser;
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "PROMPTFORGE_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Special-case override for `database.url`, set via DATABASE_URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Authentication and identity-provider integration
    pub auth: AuthConfig,
    /// Upstream generation provider configuration
    pub providers: ProvidersConfig,
    /// Credit system configuration
    pub credits: CreditsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3100,
            database_url: None,
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            providers: ProvidersConfig::default(),
            credits: CreditsConfig::default(),
        }
    }
}

/// Database configuration (external PostgreSQL).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Connection string for the database
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost:5432/promptforge".to_string(),
            max_connections: 10,
        }
    }
}

/// Authentication configuration.
///
/// Authentication itself is delegated to an identity provider deployed in
/// front of this service; a trusted proxy injects the authenticated subject
/// id and email as HTTP headers on every request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// HTTP header carrying the identity provider's subject id.
    ///
    /// The subject id is the unique key for a user. Do not fall back to
    /// email alone: two upstream providers can issue the same email for
    /// different accounts.
    pub identity_header: String,
    /// HTTP header carrying the user's email address
    pub email_header: String,
    /// Subject ids or email addresses granted admin access
    pub admin_users: Vec<String>,
    /// Identity-provider lifecycle webhook settings
    pub webhook: WebhookConfig,
    /// CORS settings for browser clients
    pub cors: CorsConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            identity_header: "x-identity-user".to_string(),
            email_header: "x-identity-email".to_string(),
            admin_users: Vec::new(),
            webhook: WebhookConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

/// Identity webhook verification settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebhookConfig {
    /// `whsec_`-prefixed signing secret shared with the identity provider
    pub secret: Option<String>,
    /// Maximum accepted age of a webhook timestamp
    #[serde(with = "humantime_serde")]
    pub tolerance: Duration,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret: None,
            tolerance: Duration::from_secs(300),
        }
    }
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// Allowed origin: either the literal `*` or an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CorsOrigin {
    Wildcard,
    Origin(String),
}

impl TryFrom<String> for CorsOrigin {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "*" {
            return Ok(CorsOrigin::Wildcard);
        }
        Url::parse(&value).map_err(|e| format!("invalid CORS origin {value:?}: {e}"))?;
        Ok(CorsOrigin::Origin(value))
    }
}

impl From<CorsOrigin> for String {
    fn from(origin: CorsOrigin) -> Self {
        match origin {
            CorsOrigin::Wildcard => "*".to_string(),
            CorsOrigin::Origin(url) => url,
        }
    }
}

/// Upstream provider configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvidersConfig {
    /// Paid image/video/text generation API
    pub paid: PaidProviderConfig,
    /// Free public image endpoint (no authentication)
    pub free_image: FreeImageConfig,
}

/// Paid generation API settings.
///
/// Set the API key via `PROMPTFORGE_PROVIDERS__PAID__API_KEY`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaidProviderConfig {
    /// Base URL of the generation API
    pub base_url: Url,
    /// Bearer token for authentication
    pub api_key: String,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for PaidProviderConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://api.kie.ai").expect("static URL"),
            api_key: String::new(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Free image endpoint settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FreeImageConfig {
    /// Base URL of the public image-generation endpoint
    pub base_url: Url,
    /// Model used when the request does not name one
    pub default_model: String,
    /// Image width used when the request does not give one
    pub default_width: u32,
    /// Image height used when the request does not give one
    pub default_height: u32,
}

impl Default for FreeImageConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://pollinations.ai").expect("static URL"),
            default_model: "flux".to_string(),
            default_width: 1024,
            default_height: 1024,
        }
    }
}

/// Credit system configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreditsConfig {
    /// Credits granted when a profile is first provisioned
    pub signup_grant: i32,
}

impl Default for CreditsConfig {
    fn default() -> Self {
        Self { signup_grant: 10 }
    }
}

impl Config {
    fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("PROMPTFORGE_").split("__"))
            .merge(Env::raw().only(&["DATABASE_URL"]))
    }

    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        // DATABASE_URL takes precedence over database.url when set
        if let Some(url) = config.database_url.take() {
            config.database.url = url;
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.providers.paid.api_key.is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: providers.paid.api_key is not configured. \
                 Set PROMPTFORGE_PROVIDERS__PAID__API_KEY or add it to the config file."
                    .to_string(),
            });
        }

        if let Some(secret) = &self.auth.webhook.secret {
            if !secret.starts_with(crate::webhooks::signing::SECRET_PREFIX) {
                return Err(Error::Internal {
                    operation: format!(
                        "Config validation: auth.webhook.secret must start with '{}'",
                        crate::webhooks::signing::SECRET_PREFIX
                    ),
                });
            }
        }

        if self.credits.signup_grant < 0 {
            return Err(Error::Internal {
                operation: "Config validation: credits.signup_grant must be non-negative".to_string(),
            });
        }

        Ok(())
    }
}
