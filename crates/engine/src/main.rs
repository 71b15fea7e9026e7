//! Humangate benchmark - compares polling and event-driven approval waits.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use humangate_engine::benchmark::{self, BenchmarkConfig};
use humangate_engine::WaitSettings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "humangate_engine=debug,humangate_bench=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Humangate benchmark");

    let settings = WaitSettings::from_env()?;
    tracing::info!(
        default_timeout = ?settings.default_timeout,
        max_timeout = ?settings.max_timeout,
        "Wait settings loaded"
    );

    let config = BenchmarkConfig::from_env()?;
    let report = benchmark::run(config, settings).await?;

    tracing::info!(
        iterations = report.iterations,
        polling_ms = report.polling.as_millis() as u64,
        event_driven_ms = report.event_driven.as_millis() as u64,
        poll_checks = report.poll_checks,
        speedup = report.speedup(),
        "Benchmark complete"
    );

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
