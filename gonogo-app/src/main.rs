mod app;
mod host;

pub use app::App;

use anyhow::Context;
use gonogo_engine::TaskConfig;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // An optional argument selects a task description file; without one the
    // built-in Go/No-Go MRI protocol runs.
    let config = match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading task config {path}"))?;
            TaskConfig::from_json(&json).with_context(|| format!("parsing task config {path}"))?
        }
        None => TaskConfig::default(),
    };

    App::new(config)?.run()
}
