use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Built storefront client, served with an SPA fallback to index.html
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    /// Origins allowed to call the API with credentials (e.g. a dev server).
    /// Empty means same-origin only.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            static_dir: default_static_dir(),
            cors_origins: Vec::new(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static/dist")
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Bootstrap admin created on startup when no user has this username
    pub admin_username: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    /// Allow `POST /api/register` once a first user exists
    #[serde(default)]
    pub allow_registration: bool,
    /// Session lifetime in hours (default: 7 days)
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    /// Interval between expired-session purges in seconds (default: 1 hour)
    #[serde(default = "default_session_cleanup_interval")]
    pub session_cleanup_interval_secs: u64,
    /// Mark the session cookie `Secure` (enable behind HTTPS)
    #[serde(default)]
    pub secure_cookies: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_username: None,
            admin_email: None,
            admin_password: None,
            allow_registration: false,
            session_ttl_hours: default_session_ttl_hours(),
            session_cleanup_interval_secs: default_session_cleanup_interval(),
            secure_cookies: false,
        }
    }
}

fn default_session_ttl_hours() -> i64 {
    24 * 7
}

fn default_session_cleanup_interval() -> u64 {
    3600
}

impl AuthConfig {
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Page size applied when a listing request has no `limit` (none: unlimited)
    #[serde(default)]
    pub default_page_size: Option<i64>,
    /// Upper bound for a requested `limit`
    #[serde(default = "default_max_page_size")]
    pub max_page_size: i64,
    /// Insert the starter categories into an empty catalog on startup
    #[serde(default = "default_seed_categories")]
    pub seed_categories: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_page_size: None,
            max_page_size: default_max_page_size(),
            seed_categories: default_seed_categories(),
        }
    }
}

fn default_max_page_size() -> i64 {
    100
}

fn default_seed_categories() -> bool {
    true
}

impl Config {
    /// Load `path`, or defaults when it does not exist.
    ///
    /// Runs before logging is set up (the log level lives in the file), so
    /// callers report which source was used; see [`Config::source`].
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&content)
        } else {
            Ok(Config::default())
        }
    }

    /// Human-readable description of where `load(path)` takes its values from
    pub fn source(path: &Path) -> String {
        if path.exists() {
            format!("Loaded configuration from {}", path.display())
        } else {
            format!("No config file found at {}, using defaults", path.display())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).with_context(|| "Failed to parse configuration file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.auth.session_ttl_hours <= 0 {
            anyhow::bail!("auth.session_ttl_hours must be positive");
        }
        if self.auth.session_cleanup_interval_secs == 0 {
            anyhow::bail!("auth.session_cleanup_interval_secs must be positive");
        }
        if self.catalog.max_page_size <= 0 {
            anyhow::bail!("catalog.max_page_size must be positive");
        }
        if let Some(size) = self.catalog.default_page_size {
            if size <= 0 || size > self.catalog.max_page_size {
                anyhow::bail!("catalog.default_page_size must be between 1 and max_page_size");
            }
        }
        for origin in &self.server.cors_origins {
            if !(origin.starts_with("http://") || origin.starts_with("https://")) {
                anyhow::bail!("server.cors_origins entries must be http(s) origins: {}", origin);
            }
        }
        let bootstrap = [
            &self.auth.admin_username,
            &self.auth.admin_email,
            &self.auth.admin_password,
        ];
        let provided = bootstrap.iter().filter(|v| v.is_some()).count();
        if provided != 0 && provided != bootstrap.len() {
            anyhow::bail!(
                "auth.admin_username, auth.admin_email and auth.admin_password must be set together"
            );
        }
        Ok(())
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.auth.session_ttl_hours, 168);
        assert!(!config.auth.allow_registration);
        assert_eq!(config.catalog.max_page_size, 100);
        assert!(config.catalog.seed_categories);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::parse(
            r#"
            [server]
            port = 8081

            [auth]
            allow_registration = true
            admin_username = "owner"
            admin_email = "owner@example.com"
            admin_password = "Str0ng-enough!"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.auth.allow_registration);
        assert_eq!(config.auth.admin_username.as_deref(), Some("owner"));
    }

    #[test]
    fn test_rejects_incomplete_bootstrap_admin() {
        let err = Config::parse(
            r#"
            [auth]
            admin_username = "owner"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("must be set together"));
    }

    #[test]
    fn test_rejects_default_page_size_above_max() {
        assert!(Config::parse(
            r#"
            [catalog]
            default_page_size = 500
            max_page_size = 100
            "#,
        )
        .is_err());
    }

    #[test]
    fn test_rejects_malformed_cors_origin() {
        assert!(Config::parse(
            r#"
            [server]
            cors_origins = ["localhost:5173"]
            "#,
        )
        .is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_source_names_the_file_or_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storefront.toml");
        assert!(Config::source(&path).contains("using defaults"));

        std::fs::write(&path, "").unwrap();
        assert!(Config::source(&path).starts_with("Loaded configuration from"));
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storefront.toml");
        std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.logging.level, "debug");
    }
}
