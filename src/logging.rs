//! Structured logging init shared by the sample binaries, matching the
//! teacher's `main.rs` initialization exactly: `tracing-subscriber`'s `fmt`
//! layer with an env filter that defaults to `info`.

pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
