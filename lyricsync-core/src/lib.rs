pub mod binding;
pub mod config;
pub mod error;
pub mod events;
pub mod link;
pub mod lyrics;
pub mod media;
pub mod paths;
pub mod state;
pub mod store;
pub mod telemetry;

pub use binding::MediaBinding;
pub use config::{Config, EventsConfig, LoggingConfig, MediaConfig, ReleasePolicy};

/// Re-export toml error type for config parsing error handling
pub use toml::de::Error as TomlParseError;
pub use error::{CoreError, Result};
pub use events::{EventBus, StoreEvent};
pub use link::link;
pub use lyrics::{LyricsBinding, LyricsParser};
pub use media::{MediaFile, MediaUrl, ObjectUrlRegistry};
pub use paths::{config_dir, config_path, log_file_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME, LOG_FILE_NAME};
pub use state::AppState;
pub use store::{Observable, Readable, Subscription, Writable};
pub use telemetry::init_tracing;
