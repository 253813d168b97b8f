// ── Diagnostics ───────────────────────────────────────────────────────────────
//
// Developer-facing logs go to stderr through `env_logger`.  `RUST_LOG`
// overrides the default `info` filter, e.g. `RUST_LOG=scrawl=debug`.

const DEFAULT_FILTER: &str = "info";

/// Install the global logger.  Safe to call more than once; later calls are
/// ignored.
pub fn init() {
    let env = env_logger::Env::default().default_filter_or(DEFAULT_FILTER);
    if env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init()
        .is_err()
    {
        log::debug!("logger already initialised");
    }
}
