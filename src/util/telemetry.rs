//! Structured logging setup.

/// Install a `tracing-subscriber` fmt subscriber filtered by `RUST_LOG`.
///
/// Does nothing when a global subscriber is already installed, so embedding
/// applications keep their own.
pub fn init_tracing() {
    init_tracing_with_default("info");
}

/// Like [`init_tracing`], falling back to `default_directive` when `RUST_LOG` is unset.
pub fn init_tracing_with_default(default_directive: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_tracing();
        init_tracing_with_default("debug");
    }
}
