pub mod error;
pub mod load;
pub mod paths;
pub mod run;
pub mod settings;

pub use error::ConfigError;
pub use load::load_settings;
pub use paths::{
    default_global_config_path, default_state_root_path, GLOBAL_SETTINGS_FILE_NAME,
    GLOBAL_STATE_DIR,
};
pub use run::{PublishConfig, RunConfig, API_BASE_OVERRIDE_ENV};
pub use settings::{
    ProviderSettings, PublishSettings, Settings, DEFAULT_BRANCH_PREFIX, DEFAULT_GITHUB_API_BASE,
    DEFAULT_PROVIDER_TIMEOUT_SECONDS, DEFAULT_TOKEN_ENV,
};
