//! Thin `log`-facade initializer shared by the `coop-sort` and `userfs`
//! crates.
//!
//! The facade itself (the `log` crate) is the same one the rest of this
//! workspace's sibling kernel build uses; only the backend changes, from a
//! bespoke `no_std` console sink to `env_logger`, since this workspace is a
//! hosted (`std`) process rather than a kernel.

/// Install the global logger. Idempotent: a second call is a no-op.
///
/// Verbosity is controlled by the `RUST_LOG` environment variable, following
/// `env_logger`'s usual convention (e.g. `RUST_LOG=debug`). With no
/// environment override the default level is `info`.
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
