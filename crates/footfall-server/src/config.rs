/// Re-export `Config` from `footfall-core` for use within this crate.
///
/// All environment-variable parsing lives in `footfall-core` so integration
/// tests can build a `Config` without touching the process environment.
pub use footfall_core::config::Config;
