use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Wardbook";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment overrides, read once at startup by [`AppConfig::from_env`].
pub const DATABASE_ENV: &str = "WARDBOOK_DATABASE";
pub const ADMIN_USERNAME_ENV: &str = "WARDBOOK_ADMIN_USERNAME";
pub const ADMIN_PASSWORD_ENV: &str = "WARDBOOK_ADMIN_PASSWORD";

/// Bootstrap administrator created when no admin exists.
pub const DEFAULT_ADMIN_USERNAME: &str = "Admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "@dmin123";

/// Signup validation
pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

/// Get the application data directory (~/Wardbook/).
///
/// Falls back to the working directory when no home directory is known.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default database location inside the data directory
pub fn default_database_path() -> PathBuf {
    app_data_dir().join("wardbook.db")
}

pub fn default_log_filter() -> &'static str {
    "wardbook_lib=info,wardbook=info"
}

/// Startup configuration, resolved once and passed down.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub admin_username: String,
    pub admin_password: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            admin_username: DEFAULT_ADMIN_USERNAME.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary key lookup; blank values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            database_path: get(DATABASE_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            admin_username: get(ADMIN_USERNAME_ENV).unwrap_or(defaults.admin_username),
            admin_password: get(ADMIN_PASSWORD_ENV).unwrap_or(defaults.admin_password),
        }
    }
}
