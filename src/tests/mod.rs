#![cfg(test)]

use std::sync::Once;

mod assertions;

mod anomaly;
mod lambert;
mod transfer;

static TRACING: Once = Once::new();

/// Routes solver warnings to the test output. Use `RUST_LOG` to see them.
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
