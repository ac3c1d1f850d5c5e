//! Logging setup for the CLI.
//!
//! Uses `env_logger` behind the standard `log` facade, controlled by
//! `RUST_LOG` (default `info`).

pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();
}
