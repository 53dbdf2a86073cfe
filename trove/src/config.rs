//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides.
//! The configuration file path defaults to `config.yaml` but can be specified
//! via the `-f` flag or the `TROVE_CONFIG` environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources
//! override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `TROVE_` override YAML values
//! 3. **DATABASE_URL** - Special case: overrides `database.url` if set
//!
//! For nested config values, use double underscores in environment variables.
//! For example, `TROVE_AUTH__NATIVE__ENABLED=false` sets `auth.native.enabled`.
//!
//! ## Configuration Structure
//!
//! - **Server**: `host`, `port` - HTTP server binding configuration
//! - **Database**: `database.url` - SQLite database location
//! - **Security**: `secret_key` - session token signing key (required)
//! - **Authentication**: `auth.native`, `auth.identity_header` - auth method configuration
//! - **Uploads**: `uploads.path`, `uploads.max_image_bytes` - blob store settings
//! - **Payments**: `payment` - optional payment provider section
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! TROVE_PORT=8080
//! DATABASE_URL="sqlite:trove.db"
//! TROVE_AUTH__NATIVE__ALLOW_REGISTRATION=false
//! TROVE_PAYMENT__STRIPE__API_KEY=sk_live_...
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "TROVE_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment
/// variables. All fields have sensible defaults defined in the `Default`
/// implementation; only `secret_key` must be provided for a running server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Base URL where the service is reachable (used for payment redirect URLs)
    pub dashboard_url: String,
    /// Shortcut for `database.url`, populated from `DATABASE_URL`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Secret key for session token signing (required for production)
    pub secret_key: Option<String>,
    /// Blob store configuration for uploaded images and receipts
    pub uploads: UploadConfig,
    /// Authentication configuration for the supported auth methods
    pub auth: AuthConfig,
    /// Payment provider configuration (optional; billing degrades gracefully without it)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            dashboard_url: "http://localhost:3000".to_string(),
            database_url: None,
            database: DatabaseConfig::default(),
            secret_key: None,
            uploads: UploadConfig::default(),
            auth: AuthConfig::default(),
            payment: None,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite connection string (e.g., "sqlite:trove.db")
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:trove.db".to_string(),
        }
    }
}

/// Blob store configuration.
///
/// Uploaded files are written below `path` under a per-domain subdirectory
/// with a generated unique filename; the relative path is what gets persisted
/// and served back under `/uploads`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Directory files are stored under
    pub path: PathBuf,
    /// Maximum accepted size for cigar photo uploads, in bytes.
    ///
    /// Only the humidor photo paths enforce this today; other upload paths
    /// accept anything up to the HTTP body limit. Known inconsistency,
    /// kept as-is pending a product decision.
    pub max_image_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("uploads"),
            max_image_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Authentication configuration for all supported auth methods.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Native email/password authentication
    pub native: NativeAuthConfig,
    /// Trusted identity-header authentication (for SSO/identity-provider integration)
    pub identity_header: IdentityHeaderConfig,
}

/// Native email/password authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct NativeAuthConfig {
    /// Enable native authentication (login/registration)
    pub enabled: bool,
    /// Allow new users to self-register
    pub allow_registration: bool,
    /// Password validation rules
    pub password: PasswordConfig,
    /// Session cookie configuration
    pub session: SessionConfig,
}

impl Default for NativeAuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_registration: true,
            password: PasswordConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

/// Trusted identity-header authentication configuration.
///
/// When the service is deployed behind an authenticating proxy (an external
/// identity provider), the proxy asserts the signed-in user's email in a
/// request header. The first sight of an unknown email creates a local user;
/// later requests backfill missing profile fields from the companion headers
/// but never overwrite values the user has set.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityHeaderConfig {
    /// Enable identity-header authentication
    pub enabled: bool,
    /// Header carrying the authenticated user's email
    pub email_header: String,
    /// Header carrying the user's display name, if the provider sends one
    pub display_name_header: String,
    /// Automatically create users on first sight
    pub auto_create_users: bool,
}

impl Default for IdentityHeaderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            email_header: "x-trove-user".to_string(),
            display_name_header: "x-trove-user-name".to_string(),
            auto_create_users: true,
        }
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Session token lifetime
    #[serde(with = "humantime_serde")]
    pub expiry: Duration,
    /// Cookie name for the session token
    pub cookie_name: String,
    /// Set the Secure flag on cookies (HTTPS only)
    pub cookie_secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiry: Duration::from_secs(7 * 24 * 60 * 60),
            cookie_name: "trove_session".to_string(),
            cookie_secure: true,
        }
    }
}

/// Password validation rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordConfig {
    /// Minimum password length
    pub min_length: usize,
    /// Maximum password length
    pub max_length: usize,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
        }
    }
}

/// Payment provider configuration.
///
/// Supports different payment providers via an enum. Credentials should be
/// set via environment variables for security.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentConfig {
    /// Stripe payment processing
    /// Set credentials via:
    /// - `TROVE_PAYMENT__STRIPE__API_KEY` - Stripe secret API key
    /// - `TROVE_PAYMENT__STRIPE__WEBHOOK_SECRET` - Webhook signing secret
    /// - `TROVE_PAYMENT__STRIPE__PRICE_ID` - Price ID of the subscription product
    Stripe(StripeConfig),
    /// Dummy payment provider for testing
    Dummy(DummyConfig),
}

/// Stripe payment configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeConfig {
    /// Stripe API key (secret key starting with sk_)
    pub api_key: String,
    /// Stripe webhook signing secret (starts with whsec_)
    pub webhook_secret: String,
    /// Stripe price ID for the subscription (starts with price_)
    pub price_id: String,
}

/// Dummy payment configuration for testing.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DummyConfig {
    /// Subscription status applied by simulated webhook events
    pub status: Option<String>,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        // if database_url is set, use it
        if let Some(url) = config.database_url.take() {
            config.database = DatabaseConfig { url };
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("TROVE_").split("__"))
            // Common DATABASE_URL pattern
            .merge(Env::raw().only(&["DATABASE_URL"]))
    }

    fn validate(&self) -> anyhow::Result<()> {
        if let Some(key) = &self.secret_key {
            if key.len() < 16 {
                anyhow::bail!("secret_key must be at least 16 characters");
            }
        }
        if self.auth.identity_header.enabled && self.auth.identity_header.email_header.is_empty() {
            anyhow::bail!("auth.identity_header.email_header must not be empty when enabled");
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert!(config.auth.native.enabled);
        assert!(config.auth.native.allow_registration);
        assert!(!config.auth.identity_header.enabled);
        assert!(config.payment.is_none());
    }

    #[test]
    fn test_yaml_and_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
secret_key: unit-test-secret-key
port: 9000
auth:
  native:
    allow_registration: false
uploads:
  path: /tmp/trove-uploads
"#,
            )?;
            jail.set_env("TROVE_PORT", "9100");
            jail.set_env("DATABASE_URL", "sqlite:other.db");

            let args = Args {
                config: "test.yaml".to_string(),
                validate: false,
            };

            let config = Config::load(&args)?;
            assert_eq!(config.port, 9100);
            assert_eq!(config.database.url, "sqlite:other.db");
            assert!(!config.auth.native.allow_registration);
            assert_eq!(config.uploads.path, std::path::PathBuf::from("/tmp/trove-uploads"));
            Ok(())
        });
    }

    #[test]
    fn test_stripe_payment_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
secret_key: unit-test-secret-key
payment:
  stripe:
    api_key: sk_test_123
    webhook_secret: whsec_123
    price_id: price_123
"#,
            )?;

            let args = Args {
                config: "test.yaml".to_string(),
                validate: false,
            };

            let config = Config::load(&args)?;
            match config.payment {
                Some(PaymentConfig::Stripe(stripe)) => {
                    assert_eq!(stripe.api_key, "sk_test_123");
                    assert_eq!(stripe.price_id, "price_123");
                }
                other => panic!("expected stripe payment config, got {other:?}"),
            }
            Ok(())
        });
    }

    #[test]
    fn test_short_secret_key_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "secret_key: short\n")?;

            let args = Args {
                config: "test.yaml".to_string(),
                validate: false,
            };

            assert!(Config::load(&args).is_err());
            Ok(())
        });
    }
}
