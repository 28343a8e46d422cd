use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::errors::NodeError;

/// Runs named jobs on fixed intervals until shut down.
pub struct Scheduler {
    stop_tx: watch::Sender<bool>,
    jobs: Vec<(String, JoinHandle<()>)>,
}

impl Scheduler {
    pub fn new() -> Self {
        let (stop_tx, _) = watch::channel(false);

        Self {
            stop_tx,
            jobs: Vec::new(),
        }
    }

    /// First run happens one `period` after registration. Late ticks are
    /// skipped so a job never overlaps itself.
    pub fn add_interval_job<F, Fut>(&mut self, name: &str, period: Duration, job: F) -> Result<(), NodeError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if period.is_zero() {
            return Err(NodeError::InvalidSetting(format!("job `{name}` needs a non-zero interval")));
        }

        let mut stop_rx = self.stop_tx.subscribe();
        let job_name = name.to_string();

        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = interval.tick() => {}
                }

                // not raced against the stop signal, a started run completes
                job().await;

                if *stop_rx.borrow() {
                    break;
                }
            }

            tracing::debug!("job {} stopped", job_name);
        });

        tracing::info!("scheduled job {} every {:?}", name, period);
        self.jobs.push((name.to_string(), handle));

        Ok(())
    }

    pub fn job_names(&self) -> Vec<&str> {
        self.jobs.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Signal every job and wait for in-flight runs to finish.
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(true);

        for (name, handle) in self.jobs {
            if let Err(e) = handle.await {
                tracing::error!("job {} ended abnormally: {}", name, e);
            }
        }

        tracing::info!("scheduler stopped");
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
