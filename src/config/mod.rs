pub mod settings;

use log::info;

pub use settings::AppSettings;

/// Initialize application configuration
pub fn init_config() -> Result<settings::AppSettings, crate::error::AppError> {
    info!("Initializing application configuration from environment");
    settings::AppSettings::from_env()
}
