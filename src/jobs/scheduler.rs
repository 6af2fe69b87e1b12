use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::jobs::lock::{TickLock, warn_if_stale};
use crate::jobs::runner::{TickReport, TickRunner};

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub run_at_start: bool,
    pub allow_overlap: bool,
    pub lock_path: PathBuf,
    /// Granularity of the interruptible sleep between ticks.
    pub poll_step: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(600),
            run_at_start: true,
            allow_overlap: false,
            lock_path: PathBuf::from(".scrape.lock"),
            poll_step: Duration::from_secs(1),
        }
    }
}

impl SchedulerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.scrape_interval(),
            run_at_start: config.run_at_start(),
            allow_overlap: config.allow_overlap(),
            lock_path: config.lock_path().to_path_buf(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Locking,
    Running,
    Exiting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Ran(TickReport),
    /// Another tick holds the lock.
    Skipped,
    Failed,
}

/// Runs ticks on a fixed interval, one at a time, until shut down.
pub struct Scheduler<R> {
    runner: R,
    config: SchedulerConfig,
    shutdown_token: CancellationToken,
    state: Mutex<SchedulerState>,
}

impl<R: TickRunner> Scheduler<R> {
    pub fn new(runner: R, config: SchedulerConfig) -> Self {
        Self {
            runner,
            config,
            shutdown_token: CancellationToken::new(),
            state: Mutex::new(SchedulerState::Idle),
        }
    }

    /// Cancelling this token stops the scheduler once the current tick, if
    /// any, has finished.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn state(&self) -> SchedulerState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(SchedulerState::Exiting)
    }

    fn set_state(&self, next: SchedulerState) {
        if let Ok(mut state) = self.state.lock() {
            debug!(from = ?*state, to = ?next, "Scheduler state change");
            *state = next;
        }
    }

    /// Start the scheduler loop
    pub async fn run(&self) {
        info!(
            interval_secs = self.config.interval.as_secs_f64(),
            run_at_start = self.config.run_at_start,
            allow_overlap = self.config.allow_overlap,
            lock = %self.config.lock_path.display(),
            "Starting worker"
        );

        if !self.config.allow_overlap {
            warn_if_stale(&self.config.lock_path);
        }

        if self.config.run_at_start && !self.shutdown_token.is_cancelled() {
            self.try_tick().await;
        }

        while !self.shutdown_token.is_cancelled() {
            if !self.sleep_interval().await {
                break;
            }
            self.try_tick().await;
        }

        self.set_state(SchedulerState::Exiting);
        info!("Worker exited cleanly");
    }

    /// One tick attempt guarded by the lock file. The lock is released on
    /// every path out of here.
    pub async fn try_tick(&self) -> TickOutcome {
        self.set_state(SchedulerState::Locking);

        let _lock = if self.config.allow_overlap {
            None
        } else {
            match TickLock::acquire(&self.config.lock_path) {
                Ok(Some(lock)) => Some(lock),
                Ok(None) => {
                    warn!(
                        lock = %self.config.lock_path.display(),
                        "Previous run still in progress, skipping this tick"
                    );
                    self.set_state(SchedulerState::Idle);
                    return TickOutcome::Skipped;
                }
                Err(e) => {
                    error!(
                        lock = %self.config.lock_path.display(),
                        error = %e,
                        "Failed to create lock file"
                    );
                    self.set_state(SchedulerState::Idle);
                    return TickOutcome::Failed;
                }
            }
        };

        self.set_state(SchedulerState::Running);
        info!("Starting scrape tick");
        let outcome = match self.runner.run_tick().await {
            Ok(report) => TickOutcome::Ran(report),
            Err(e) => {
                error!("Tick failed: {:#}", e);
                TickOutcome::Failed
            }
        };

        self.set_state(SchedulerState::Idle);
        outcome
    }

    /// Sleep for one interval in `poll_step` increments. Returns `false` if
    /// shutdown was requested meanwhile.
    async fn sleep_interval(&self) -> bool {
        let step = self.config.poll_step.max(Duration::from_millis(1));
        let mut slept = Duration::ZERO;

        while slept < self.config.interval {
            let nap = step.min(self.config.interval - slept);
            tokio::select! {
                _ = self.shutdown_token.cancelled() => return false,
                _ = sleep(nap) => {}
            }
            slept += nap;
        }

        !self.shutdown_token.is_cancelled()
    }
}

/// Cancel `token` on SIGINT or SIGTERM (Ctrl-C elsewhere).
pub fn spawn_signal_listener(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(name) => {
                info!(signal = name, "Received shutdown signal, finishing current work");
                token.cancel();
            }
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = interrupt.recv() => Ok("SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
