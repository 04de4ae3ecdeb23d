use crate::config::FlowmapConfig;

/// Install the global logger.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` (for example `"info"`
/// or `"flowmap_lib=debug"`) is used. Later calls keep the first logger.
pub fn init(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}

/// Install the global logger with the level from `config`.
pub fn init_from_config(config: &FlowmapConfig) {
    init(&config.log_level);
}
