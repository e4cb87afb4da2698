//! Configuration for the farm backend
//!
//! CLI arguments and environment variable handling using clap. Everything
//! here is read once at startup; components receive the derived immutable
//! structs (`AuthConfig`, `InitDataPolicy`) instead of reading the
//! environment per call.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::types::FarmError;

/// Development-only JWT secret used when `DEV_MODE` is on and no secret is set
pub const DEV_JWT_SECRET: &str = "dev-mode-secret-not-for-production-use-123456";

/// Crazy Farm game backend
#[derive(Parser, Debug, Clone)]
#[command(name = "crazyfarm")]
#[command(about = "Game backend for the Crazy Farm Telegram mini app")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8000")]
    pub listen: SocketAddr,

    /// Enable development mode (in-memory fallbacks, dev JWT secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// NATS configuration
    #[command(flatten)]
    pub nats: NatsArgs,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "crazyfarm")]
    pub mongodb_db: String,

    /// JWT secret for session token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Session token lifetime in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "86400")]
    pub jwt_expiry_seconds: u64,

    /// Telegram bot token, the shared secret behind init data signatures
    #[arg(long, env = "TELEGRAM_TOKEN")]
    pub telegram_token: Option<String>,

    /// Maximum init data age in seconds (0 disables the freshness check)
    #[arg(long, env = "TELEGRAM_INIT_DATA_TTL", default_value = "0")]
    pub telegram_init_data_ttl: f64,

    /// Bot link used to build referral links (e.g. https://t.me/crazyfarm_bot/app)
    #[arg(long, env = "TELEGRAM_BOT_LINK", default_value = "")]
    pub telegram_bot_link: String,

    /// Accept init data with a bad signature or stale auth_date (DEV_MODE only)
    #[arg(long, env = "SKIP_INIT_DATA_VERIFY", default_value = "false")]
    pub skip_init_data_verify: bool,

    /// Comma-separated list of allowed CORS origins (empty allows any)
    #[arg(long, env = "CORS_ORIGINS", default_value = "")]
    pub cors_origins: String,

    /// Optional JSON file with task definitions upserted at startup
    #[arg(long, env = "TASK_CATALOG")]
    pub task_catalog: Option<PathBuf>,

    /// Timeout for the subscription check round-trip in milliseconds
    #[arg(long, env = "SUBSCRIPTION_CHECK_TIMEOUT_MS", default_value = "10000")]
    pub subscription_check_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format (text or json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,
}

/// NATS connection configuration
#[derive(Parser, Debug, Clone)]
pub struct NatsArgs {
    /// NATS server URL
    #[arg(long, env = "NATS_URL", default_value = "nats://127.0.0.1:4222")]
    pub nats_url: String,

    /// NATS username (optional)
    #[arg(long, env = "NATS_USER")]
    pub nats_user: Option<String>,

    /// NATS password (optional)
    #[arg(long, env = "NATS_PASSWORD")]
    pub nats_password: Option<String>,
}

/// How strictly inbound init data is verified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMode {
    /// Signature and freshness failures reject the request
    Enforce,
    /// Signature and freshness failures are logged and accepted.
    /// Only reachable with `DEV_MODE` plus `SKIP_INIT_DATA_VERIFY`.
    Permissive,
}

/// Init data verification policy
#[derive(Debug, Clone)]
pub struct InitDataPolicy {
    /// Maximum accepted age; `None` disables the freshness requirement
    pub ttl: Option<Duration>,
    pub mode: VerifyMode,
}

/// Immutable authentication configuration shared by the auth components
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub bot_token: String,
    pub bot_link: String,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub init_data: InitDataPolicy,
}

impl Args {
    /// Get effective JWT secret (uses default in dev mode)
    pub fn effective_jwt_secret(&self) -> Option<String> {
        match &self.jwt_secret {
            Some(secret) => Some(secret.clone()),
            None if self.dev_mode => Some(DEV_JWT_SECRET.to_string()),
            None => None,
        }
    }

    /// Init data freshness window, `None` when disabled
    pub fn init_data_ttl(&self) -> Option<Duration> {
        if self.telegram_init_data_ttl > 0.0 {
            Some(Duration::from_secs_f64(self.telegram_init_data_ttl))
        } else {
            None
        }
    }

    pub fn verify_mode(&self) -> VerifyMode {
        if self.dev_mode && self.skip_init_data_verify {
            VerifyMode::Permissive
        } else {
            VerifyMode::Enforce
        }
    }

    /// Allowed CORS origins; an empty list allows any origin
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn subscription_check_timeout(&self) -> Duration {
        Duration::from_millis(self.subscription_check_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            if self.jwt_secret.is_none() {
                return Err("JWT_SECRET is required in production mode".to_string());
            }
            if self.skip_init_data_verify {
                return Err("SKIP_INIT_DATA_VERIFY is only allowed with DEV_MODE".to_string());
            }
        }

        // Init data signed with an empty key can be forged by anyone
        if self.telegram_token.as_deref().map_or(true, str::is_empty) {
            return Err("TELEGRAM_TOKEN is required".to_string());
        }

        if !self.telegram_init_data_ttl.is_finite() || self.telegram_init_data_ttl < 0.0 {
            return Err("TELEGRAM_INIT_DATA_TTL must be a non-negative number".to_string());
        }

        if let Some(secret) = &self.jwt_secret {
            if secret.len() < 32 {
                return Err("JWT_SECRET must be at least 32 characters".to_string());
            }
        }

        if self.jwt_expiry_seconds == 0 {
            return Err("JWT_EXPIRY_SECONDS must be greater than zero".to_string());
        }

        Ok(())
    }

    /// Build the immutable auth configuration
    pub fn auth_config(&self) -> Result<AuthConfig, FarmError> {
        let jwt_secret = self
            .effective_jwt_secret()
            .ok_or_else(|| FarmError::Config("JWT_SECRET is required in production mode".into()))?;
        let bot_token = self
            .telegram_token
            .clone()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| FarmError::Config("TELEGRAM_TOKEN is required".into()))?;

        Ok(AuthConfig {
            bot_token,
            bot_link: self.telegram_bot_link.clone(),
            jwt_secret,
            token_ttl: Duration::from_secs(self.jwt_expiry_seconds),
            init_data: InitDataPolicy {
                ttl: self.init_data_ttl(),
                mode: self.verify_mode(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-at-least-32-characters-long";

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["crazyfarm"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_production_requires_secrets() {
        let args = parse(&[]);
        assert!(args.validate().is_err());

        let args = parse(&["--jwt-secret", SECRET, "--telegram-token", "t"]);
        assert!(args.validate().is_ok());

        let args = parse(&["--jwt-secret", "short", "--telegram-token", "t"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_skip_verify_rejected_outside_dev_mode() {
        let args = parse(&[
            "--jwt-secret",
            SECRET,
            "--telegram-token",
            "t",
            "--skip-init-data-verify",
        ]);
        assert!(args.validate().is_err());
        assert_eq!(args.verify_mode(), VerifyMode::Enforce);
    }

    #[test]
    fn test_dev_mode_still_requires_bot_token() {
        let args = parse(&["--dev-mode"]);
        assert!(args.validate().is_err());
        assert!(matches!(args.auth_config(), Err(FarmError::Config(_))));

        let args = parse(&["--dev-mode", "--telegram-token", ""]);
        assert!(args.validate().is_err());
        assert!(matches!(args.auth_config(), Err(FarmError::Config(_))));
    }

    #[test]
    fn test_dev_mode_permissive_needs_explicit_flag() {
        let args = parse(&["--dev-mode", "--telegram-token", "t"]);
        assert_eq!(args.verify_mode(), VerifyMode::Enforce);

        let args = parse(&["--dev-mode", "--telegram-token", "t", "--skip-init-data-verify"]);
        assert_eq!(args.verify_mode(), VerifyMode::Permissive);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_ttl_zero_disables_freshness() {
        let args = parse(&["--dev-mode"]);
        assert_eq!(args.init_data_ttl(), None);

        let args = parse(&["--dev-mode", "--telegram-init-data-ttl", "1.5"]);
        assert_eq!(args.init_data_ttl(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_dev_mode_auth_config_defaults() {
        let config = parse(&["--dev-mode", "--telegram-token", "t"])
            .auth_config()
            .unwrap();
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.token_ttl, Duration::from_secs(86400));
        assert_eq!(config.bot_token, "t");
    }

    #[test]
    fn test_cors_origin_list() {
        let args = parse(&[
            "--dev-mode",
            "--cors-origins",
            "http://localhost:5173, https://farm.example ,",
        ]);
        assert_eq!(
            args.cors_origin_list(),
            vec!["http://localhost:5173", "https://farm.example"]
        );
    }
}
