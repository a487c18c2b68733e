//! Backing store address and credentials

use serde::{Deserialize, Serialize};

/// TLS negotiation mode for the backing store connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    /// Plain TCP
    Disable,
    /// Try TLS first, fall back to plain TCP
    #[default]
    Prefer,
    /// TLS is mandatory
    Require,
}

impl SslMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
        }
    }
}

impl std::str::FromStr for SslMode {
    type Err = crate::SentioError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "allow" | "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            other => Err(crate::SentioError::Configuration(format!(
                "unknown ssl mode '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SslMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the backing store lives and how to authenticate against it
///
/// The password is never serialized and is redacted in `Debug` output.
#[derive(Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(skip)]
    pub password: Option<String>,
    #[serde(default)]
    pub ssl_mode: SslMode,
    /// PEM file with the root certificate used to verify the server
    #[serde(default)]
    pub ssl_root_cert: Option<String>,
}

impl Endpoint {
    /// Create an endpoint without credentials
    pub fn new(host: impl Into<String>, port: u16, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            user: "postgres".to_string(),
            password: None,
            ssl_mode: SslMode::default(),
            ssl_root_cert: None,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_ssl_mode(mut self, ssl_mode: SslMode) -> Self {
        self.ssl_mode = ssl_mode;
        self
    }

    pub fn with_ssl_root_cert(mut self, path: impl Into<String>) -> Self {
        self.ssl_root_cert = Some(path.into());
        self
    }

    /// Check the endpoint for values that can never produce a connection
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.trim().is_empty() {
            return Err(crate::SentioError::Configuration(
                "host must not be empty".into(),
            ));
        }
        if self.port == 0 {
            return Err(crate::SentioError::Configuration(
                "port must be greater than 0".into(),
            ));
        }
        if self.database.trim().is_empty() {
            return Err(crate::SentioError::Configuration(
                "database must not be empty".into(),
            ));
        }
        if self.user.trim().is_empty() {
            return Err(crate::SentioError::Configuration(
                "user must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Connection string without the password, safe to log
    pub fn display_url(&self) -> String {
        format!(
            "postgresql://{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("ssl_mode", &self.ssl_mode)
            .field("ssl_root_cert", &self.ssl_root_cert)
            .finish()
    }
}
