use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use sentio_connection::{BackoffStrategy, ConnectionDescriptor, PoolConfig, RetryPolicy};
use sentio_core::{Endpoint, SslMode};
use sentio_service::logging::LogFormat;

/// sentio - sentiment predictions backed by a resilient PostgreSQL pool
#[derive(Parser, Debug)]
#[command(name = "sentio")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub database: DatabaseArgs,

    #[command(flatten)]
    pub pool: PoolArgs,

    #[command(flatten)]
    pub retry: RetryArgs,

    /// Console log format
    #[arg(long, global = true, default_value = "pretty", env = "SENTIO_LOG_FORMAT")]
    pub log_format: LogFormatArg,

    /// Directory for rotated JSON log files
    #[arg(long, global = true, env = "SENTIO_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(long, global = true, default_value = "table")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify text and log the prediction
    Predict {
        /// Text to classify; several words are joined with spaces
        #[arg(value_name = "TEXT", required = true)]
        text: Vec<String>,
    },

    /// Report liveness and readiness once
    Health,

    /// Report readiness periodically until interrupted
    Watch {
        /// Seconds between readiness checks
        #[arg(long, default_value = "5")]
        interval: u64,
    },

    /// Show the most recently logged predictions
    Recent {
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Args, Debug)]
pub struct DatabaseArgs {
    #[arg(long, global = true, default_value = "localhost", env = "SENTIO_DB_HOST")]
    pub db_host: String,

    #[arg(long, global = true, default_value = "5432", env = "SENTIO_DB_PORT")]
    pub db_port: u16,

    #[arg(long, global = true, default_value = "sentio", env = "SENTIO_DB_NAME")]
    pub db_name: String,

    #[arg(long, global = true, default_value = "postgres", env = "SENTIO_DB_USER")]
    pub db_user: String,

    #[arg(long, global = true, env = "SENTIO_DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    /// File holding the password, e.g. a mounted secret
    #[arg(long, global = true, env = "SENTIO_DB_PASSWORD_FILE", conflicts_with = "db_password")]
    pub db_password_file: Option<PathBuf>,

    /// disable, prefer or require
    #[arg(long, global = true, default_value = "prefer", env = "SENTIO_DB_SSL_MODE")]
    pub db_ssl_mode: String,

    /// PEM root certificate used to verify the server
    #[arg(long, global = true, env = "SENTIO_DB_SSL_ROOT_CERT")]
    pub db_ssl_root_cert: Option<String>,
}

#[derive(Args, Debug)]
pub struct PoolArgs {
    #[arg(long, global = true, default_value = "2", env = "SENTIO_POOL_MIN")]
    pub pool_min: usize,

    #[arg(long, global = true, default_value = "10", env = "SENTIO_POOL_MAX")]
    pub pool_max: usize,

    #[arg(long, global = true, default_value = "5000", env = "SENTIO_CONNECT_TIMEOUT_MS")]
    pub connect_timeout_ms: u64,

    #[arg(long, global = true, default_value = "10000", env = "SENTIO_ACQUIRE_TIMEOUT_MS")]
    pub acquire_timeout_ms: u64,

    #[arg(long, global = true, default_value = "2000", env = "SENTIO_PING_TIMEOUT_MS")]
    pub ping_timeout_ms: u64,
}

#[derive(Args, Debug)]
pub struct RetryArgs {
    #[arg(long, global = true, default_value = "500", env = "SENTIO_RETRY_INITIAL_MS")]
    pub retry_initial_ms: u64,

    #[arg(long, global = true, default_value = "30000", env = "SENTIO_RETRY_MAX_MS")]
    pub retry_max_ms: u64,

    /// Attempts before the delay stays at its ceiling
    #[arg(long, global = true, default_value = "10", env = "SENTIO_RETRY_MAX_ATTEMPTS")]
    pub retry_max_attempts: u32,

    /// Disable random jitter on retry delays
    #[arg(long, global = true, env = "SENTIO_RETRY_NO_JITTER")]
    pub retry_no_jitter: bool,
}

impl Cli {
    /// Build and validate the pool descriptor from flags and environment
    pub fn descriptor(&self) -> Result<ConnectionDescriptor> {
        let db = &self.database;
        let ssl_mode: SslMode = db.db_ssl_mode.parse().context("invalid --db-ssl-mode")?;

        let mut endpoint = Endpoint::new(&db.db_host, db.db_port, &db.db_name)
            .with_user(&db.db_user)
            .with_ssl_mode(ssl_mode);
        if let Some(password) = self.password()? {
            endpoint = endpoint.with_password(password);
        }
        if let Some(cert) = &db.db_ssl_root_cert {
            endpoint = endpoint.with_ssl_root_cert(cert);
        }

        let pool = PoolConfig::new(self.pool.pool_min, self.pool.pool_max)
            .with_connect_timeout_ms(self.pool.connect_timeout_ms)
            .with_acquire_timeout_ms(self.pool.acquire_timeout_ms)
            .with_ping_timeout_ms(self.pool.ping_timeout_ms);

        let backoff = BackoffStrategy::new(self.retry.retry_initial_ms, self.retry.retry_max_ms)
            .with_jitter(!self.retry.retry_no_jitter);
        let retry = RetryPolicy::new(backoff, self.retry.retry_max_attempts);

        let descriptor = ConnectionDescriptor::new(endpoint)
            .with_pool(pool)
            .with_retry(retry);
        descriptor
            .validate()
            .context("invalid connection settings")?;
        Ok(descriptor)
    }

    fn password(&self) -> Result<Option<String>> {
        let db = &self.database;
        match (&db.db_password, &db.db_password_file) {
            (Some(password), _) => Ok(Some(password.clone())),
            (None, Some(path)) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read password file {}", path.display()))?;
                let password = contents.trim_end_matches(['\r', '\n']);
                if password.is_empty() {
                    bail!("password file {} is empty", path.display());
                }
                Ok(Some(password.to_string()))
            }
            (None, None) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("sentio").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_produce_valid_descriptor() {
        let cli = parse(&["health"]);
        let descriptor = cli.descriptor().unwrap();

        assert_eq!(descriptor.endpoint.host, "localhost");
        assert_eq!(descriptor.endpoint.port, 5432);
        assert_eq!(descriptor.pool.min_size(), 2);
        assert_eq!(descriptor.pool.max_size(), 10);
        assert!(descriptor.retry.backoff.has_jitter());
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = parse(&[
            "--db-host",
            "db.internal",
            "--pool-min",
            "1",
            "--pool-max",
            "4",
            "--retry-no-jitter",
            "--db-ssl-mode",
            "require",
            "predict",
            "great",
            "stuff",
        ]);
        let descriptor = cli.descriptor().unwrap();

        assert_eq!(descriptor.endpoint.host, "db.internal");
        assert_eq!(descriptor.endpoint.ssl_mode, SslMode::Require);
        assert_eq!(descriptor.pool.max_size(), 4);
        assert!(!descriptor.retry.backoff.has_jitter());
        match cli.command {
            Command::Predict { text } => assert_eq!(text, vec!["great", "stuff"]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_invalid_pool_sizes_are_rejected() {
        let cli = parse(&["--pool-min", "5", "--pool-max", "2", "health"]);
        let err = cli.descriptor().unwrap_err();
        assert!(format!("{err:#}").contains("min_size (5) cannot exceed max_size (2)"));
    }

    #[test]
    fn test_password_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("password");
        std::fs::write(&path, "s3cret\n").unwrap();

        let cli = parse(&["--db-password-file", path.to_str().unwrap(), "health"]);
        let descriptor = cli.descriptor().unwrap();
        assert_eq!(descriptor.endpoint.password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_empty_password_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("password");
        std::fs::write(&path, "\n").unwrap();

        let cli = parse(&["--db-password-file", path.to_str().unwrap(), "health"]);
        assert!(cli.descriptor().is_err());
    }

    #[test]
    fn test_unknown_ssl_mode_is_rejected() {
        let cli = parse(&["--db-ssl-mode", "sometimes", "health"]);
        let err = cli.descriptor().unwrap_err();
        assert!(format!("{err:#}").contains("unknown ssl mode 'sometimes'"));
    }
}
