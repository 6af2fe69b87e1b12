use anyhow::Result;
use newsharvest::{
    config::{Config, LogFormat},
    jobs::{Pipeline, Scheduler, SchedulerConfig, spawn_signal_listener},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &Config) {
    let (filter, invalid) = match EnvFilter::try_new(config.log_level().to_lowercase()) {
        Ok(filter) => (filter, false),
        Err(_) => (EnvFilter::new("info"), true),
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.log_format() {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }

    if invalid {
        warn!(level = config.log_level(), "Unrecognised LOG_LEVEL, using info");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;
    init_tracing(&config);

    let pipeline = Pipeline::from_config(&config);
    info!(feeds = pipeline.sources().len(), "Configured feeds");

    let scheduler = Scheduler::new(pipeline, SchedulerConfig::from_config(&config));
    spawn_signal_listener(scheduler.shutdown_token());

    scheduler.run().await;
    Ok(())
}
