//! Tracing/logging setup shared by the OctoOps console binaries.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize process-wide tracing using `OCTOOPS_LOG_FORMAT` and `RUST_LOG`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    let raw = std::env::var("OCTOOPS_LOG_FORMAT").ok();
    let parsed = raw.as_deref().map(str::parse::<LogFormat>);
    tracing::init(parsed.clone().and_then(Result::ok).unwrap_or_default(), None);

    if let Some(Err(err)) = parsed {
        ::tracing::warn!("OCTOOPS_LOG_FORMAT ignored: {err}");
    }
}
