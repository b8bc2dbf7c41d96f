//! CLI command implementations

mod config;
mod logs;
mod stream;

pub use config::{config_get, config_init, config_path, config_show, load_effective_config};
pub use logs::{logs_delete, logs_export, logs_list, logs_path, logs_show};
pub use stream::{stream_command, StreamOptions};
