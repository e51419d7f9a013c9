use tracing_subscriber::EnvFilter;

/// Installs a thread-default subscriber writing through the test harness,
/// so `RUST_LOG=debug cargo test -- --nocapture` shows dispatch logs.
pub struct TestTracing {
    _guard: tracing::subscriber::DefaultGuard,
}

impl TestTracing {
    pub fn init() -> Self {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .finish();
        Self {
            _guard: tracing::subscriber::set_default(subscriber),
        }
    }
}
