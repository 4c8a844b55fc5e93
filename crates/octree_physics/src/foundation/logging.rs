//! Logging setup shared by binaries built on the crate

/// Initialize the logging system
///
/// Honors `RUST_LOG`; defaults to `info` when it is unset. Calling this more
/// than once is harmless.
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
