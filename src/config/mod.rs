use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub rental: RentalConfig,
    #[serde(default)]
    pub site: SiteConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub session_duration_hours: i64,
    /// Session lifetime when "remember me" is ticked on the login form.
    pub remember_me_days: i64,
    #[serde(default)]
    pub secure_cookies: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RentalConfig {
    /// Days a borrower has before a rental shows as overdue. Informational only,
    /// rent keeps accruing per day until the item is returned.
    pub return_window_days: i64,
}

impl Default for RentalConfig {
    fn default() -> Self {
        Self { return_window_days: 7 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    pub app_name: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            app_name: "Media Shelf".to_string(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.base_url", "http://localhost:8080")?
            .set_default("database.url", "sqlite://mediashelf.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("auth.session_duration_hours", 24)?
            .set_default("auth.remember_me_days", 30)?
            .set_default("auth.secure_cookies", false)?
            .set_default("rental.return_window_days", 7)?
            .set_default("site.app_name", "Media Shelf")?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with MEDIASHELF__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("MEDIASHELF").separator("__"))

            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                base_url: "http://localhost:8080".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://mediashelf.db?mode=rwc".to_string(),
                max_connections: 10,
            },
            auth: AuthConfig {
                session_duration_hours: 24,
                remember_me_days: 30,
                secure_cookies: false,
            },
            rental: RentalConfig::default(),
            site: SiteConfig::default(),
        }
    }
}
