pub mod accounts; // Signup, login, bootstrap admin
pub mod appointment; // Book / Complete / Cancel
pub mod authorization;
pub mod config;
pub mod crypto;
pub mod dashboard;
pub mod db;
pub mod directory; // Searches + admin management
pub mod error;
pub mod models;
pub mod treatment;

#[cfg(test)]
pub(crate) mod test_support;

pub use authorization::AuthContext;
pub use error::CoreError;

use tracing_subscriber::EnvFilter;

/// Bootstrap: open and migrate the database, make sure an administrator
/// exists, then report what is there.
pub fn run() -> Result<(), CoreError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("Wardbook starting v{}", config::APP_VERSION);

    let config = config::AppConfig::from_env();
    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = db::sqlite::open_database(&config.database_path)?;
    if let Some(admin) = accounts::ensure_admin(&conn, &config)? {
        tracing::info!(identity_id = admin.id, "Bootstrap admin ready");
    }

    tracing::info!(
        path = %config.database_path.display(),
        doctors = db::repository::count_doctors(&conn)?,
        patients = db::repository::count_patients(&conn)?,
        appointments = db::repository::count_appointments(&conn, &models::AppointmentFilter::default())?,
        "Database ready"
    );
    Ok(())
}
