//! Tracing/logging setup shared by binaries. Library crates only emit events.

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::DEFAULT_FILTER);
}

/// Same as [`init`] with a caller-chosen fallback filter (used when `RUST_LOG` is unset).
pub fn init_with_default(filter: &str) {
    tracing::init(filter);
}

/// Tracing configuration (filters, layers).
pub mod tracing;
