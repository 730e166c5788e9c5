//! Public SDK surface for persona-talk.
//!
//! This crate re-exports the core building blocks and provides a small
//! initialization helper to keep consumer setup consistent.

pub mod console;

/// Re-export for convenience.
pub use persona_talk_config as config;
pub use persona_talk_core as core;
/// Re-export for convenience.
pub use persona_talk_protocol as protocol;
/// Re-export for convenience.
pub use persona_talk_store as store;

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// Binaries are still expected to call this early in startup.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::builder()
            .format_timestamp_millis()
            .parse_default_env()
            .try_init();
    }
}
