use std::{sync::Arc, time::Duration};

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    fetcher::FetchWindow,
    poller::{Feed, Poller},
};

/// When a recurring job fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Every fixed interval, starting immediately.
    Interval(Duration),
    /// Once a day at this UTC time.
    Daily(NaiveTime),
}

impl Trigger {
    /// Delay before the first run.
    pub fn first_delay(&self, now: DateTime<Utc>) -> Duration {
        match self {
            Trigger::Interval(_) => Duration::ZERO,
            Trigger::Daily(_) => self.next_delay(now),
        }
    }

    /// Delay before the next run after one has just finished.
    pub fn next_delay(&self, now: DateTime<Utc>) -> Duration {
        match self {
            Trigger::Interval(interval) => *interval,
            Trigger::Daily(at) => {
                let today_at = now.date_naive().and_time(*at).and_utc();
                let next =
                    if today_at > now { today_at } else { today_at + TimeDelta::days(1) };
                (next - now).to_std().unwrap_or_default()
            }
        }
    }
}

/// A feed pushed to all destinations on a trigger.
pub struct Job {
    /// What to fetch and how to render it.
    pub feed: Arc<Feed>,
    /// Date window passed to the fetcher.
    pub window: FetchWindow,
    /// When the job fires.
    pub trigger: Trigger,
}

/// Owns the recurring jobs. Jobs run as tasks on the shared runtime and stop
/// arming new timers once the token is cancelled; a cycle already in flight
/// runs to completion.
pub struct Scheduler {
    poller: Arc<Poller>,
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Creates a scheduler with no jobs.
    pub fn new(poller: Arc<Poller>) -> Self {
        Self { poller, token: CancellationToken::new(), handles: Vec::new() }
    }

    /// Starts running `job` on its trigger until shutdown.
    pub fn spawn(&mut self, job: Job) {
        let poller = self.poller.clone();
        let token = self.token.clone();

        tracing::info!("Scheduling {} push: {:?} ({:?})", job.feed.name, job.trigger, job.window);

        let handle = tokio::spawn(async move {
            let mut delay = job.trigger.first_delay(Utc::now());
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::debug!("Stopping {} push", job.feed.name);
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }

                poller.run_cycle(&job.feed, job.window).await;
                delay = job.trigger.next_delay(Utc::now());
            }
        });

        self.handles.push(handle);
    }

    /// Stops arming timers and waits for in-flight cycles to drain.
    pub async fn shutdown(self) {
        tracing::info!("Shutting down {} scheduled jobs", self.handles.len());
        self.token.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!("Scheduled job ended abnormally: {e}");
            }
        }
    }
}
