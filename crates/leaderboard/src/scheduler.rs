use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Drives when the scheduler runs. Returns `false` once no more ticks will come.
pub trait TickSource: Send + 'static {
    fn next_tick(&mut self) -> impl Future<Output = bool> + Send;
}

/// Fires immediately, then every `period`. Ticks missed while a refresh is
/// still running collapse into a single catch-up tick.
pub struct IntervalTicks(Interval);

impl IntervalTicks {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self(interval)
    }
}

impl TickSource for IntervalTicks {
    async fn next_tick(&mut self) -> bool {
        self.0.tick().await;
        true
    }
}

/// Ticks delivered by hand through a channel.
pub struct ManualTicks(mpsc::Receiver<()>);

impl ManualTicks {
    pub fn channel(capacity: usize) -> (mpsc::Sender<()>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self(rx))
    }
}

impl TickSource for ManualTicks {
    async fn next_tick(&mut self) -> bool {
        self.0.recv().await.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("scheduler `{0}` is already running")]
    AlreadyRunning(String),
}

struct Running {
    cancel: CancellationToken,
    /// Held while deciding whether to invoke and while cancelling.
    launch: Arc<Mutex<()>>,
    handle: JoinHandle<()>,
}

/// Runs a refresh operation on every tick, one invocation at a time.
///
/// The next tick is awaited only after the previous invocation finished, so
/// invocations never overlap. `stop` cancels pending ticks and no invocation
/// starts once it returns; an invocation already running is left to finish.
pub struct RefreshScheduler {
    name: String,
    running: Option<Running>,
}

impl RefreshScheduler {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            running: None,
        }
    }

    pub fn start<F, Fut>(&mut self, refresh: F, interval: Duration) -> Result<(), SchedulerError>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.start_with(IntervalTicks::new(interval), refresh)
    }

    pub fn start_with<T, F, Fut>(&mut self, mut ticks: T, mut refresh: F) -> Result<(), SchedulerError>
    where
        T: TickSource,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.running.is_some() {
            return Err(SchedulerError::AlreadyRunning(self.name.clone()));
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let launch = Arc::new(Mutex::new(()));
        let launch_gate = Arc::clone(&launch);
        let name = self.name.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    more = ticks.next_tick() => {
                        if !more {
                            break;
                        }
                    }
                }
                let invocation = {
                    let _launch = launch_gate.lock().unwrap_or_else(PoisonError::into_inner);
                    if token.is_cancelled() {
                        break;
                    }
                    refresh()
                };
                tracing::debug!(job = %name, "scheduler tick");
                invocation.await;
            }
            tracing::debug!(job = %name, "scheduler stopped");
        });

        self.running = Some(Running {
            cancel,
            launch,
            handle,
        });
        tracing::info!(job = %self.name, "scheduler started");
        Ok(())
    }

    /// Idempotent.
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            let _launch = running.launch.lock().unwrap_or_else(PoisonError::into_inner);
            running.cancel.cancel();
            tracing::info!(job = %self.name, "scheduler stop requested");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.cancel.is_cancelled() && !r.handle.is_finished())
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
