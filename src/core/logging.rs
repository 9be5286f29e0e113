use env_logger::Env;

pub const LOG_ENV: &str = "REPACK_LOG";
pub const LOG_STYLE_ENV: &str = "REPACK_LOG_STYLE";

/// Install the global logger. `REPACK_LOG` takes the usual `env_logger` filter syntax.
pub fn init() {
    let env = Env::new()
        .filter_or(LOG_ENV, "info")
        .write_style(LOG_STYLE_ENV);

    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .init();
}
