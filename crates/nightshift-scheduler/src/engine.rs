use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::watch;
use tracing::{error, info, warn};

use nightshift_portainer::{PortainerClient, Result};

use crate::clock::{Clock, SystemClock};
use crate::schedule::DailySchedule;

/// Drives the daily restart: polls the clock, fires resolve + restart at
/// most once per calendar day, and never lets a failed attempt take the
/// process down.
///
/// `last_fired` is the only schedule state and lives in memory only — a
/// process restart starts with a clean slate, so a restart after today's
/// trigger time fires again within one poll interval.
pub struct RestartEngine {
    client: PortainerClient,
    container: String,
    schedule: DailySchedule,
    poll_interval: Duration,
    clock: Arc<dyn Clock>,
    last_fired: Option<NaiveDate>,
}

impl RestartEngine {
    pub fn new(
        client: PortainerClient,
        container: String,
        schedule: DailySchedule,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            container,
            schedule,
            poll_interval,
            clock: Arc::new(SystemClock),
            last_fired: None,
        }
    }

    /// Replace the wall clock. Tests drive the engine with a settable clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Main loop. Polls until `shutdown` broadcasts `true`; the loop never
    /// polls while a fire attempt is in flight, so concurrent attempts are
    /// impossible by construction.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            container = %self.container,
            time = %self.schedule,
            poll_secs = self.poll_interval.as_secs(),
            "restart engine started"
        );

        // One resolution up front so a misconfigured container name shows
        // up in the logs long before the first fire. The result is not
        // cached — every fire resolves again.
        match self.client.resolve(&self.container).await {
            Ok(id) => info!(container_id = %short_id(&id), "target container found"),
            Err(e) => {
                warn!(
                    container = %self.container,
                    error = %e,
                    "target container not resolvable at startup; will try again at fire time"
                );
            }
        }
        self.log_next_fire();

        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => self.tick().await,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("restart engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One poll: check the schedule, fire if due. Errors are logged, never
    /// propagated — a failed attempt waits for the next calendar day.
    async fn tick(&mut self) {
        let now = self.clock.now();
        if !self.schedule.is_due(now, self.last_fired) {
            return;
        }

        // Claim today before touching the network. A slow attempt spanning
        // several poll ticks, or a failed one, must not fire again today.
        self.last_fired = Some(now.date_naive());

        info!(container = %self.container, "restart window reached, firing");
        match self.fire().await {
            Ok(id) => {
                info!(container_id = %short_id(&id), "container restarted");
            }
            Err(e) => {
                error!(
                    container = %self.container,
                    error = %e,
                    "restart attempt failed; no same-day retry, next attempt is tomorrow"
                );
            }
        }
        self.log_next_fire();
    }

    async fn fire(&self) -> Result<String> {
        let id = self.client.resolve(&self.container).await?;
        self.client.restart(&id).await?;
        Ok(id)
    }

    fn log_next_fire(&self) {
        let now = self.clock.now();
        // After a fire today, is_due is false until tomorrow, so "next" is
        // tomorrow's trigger; before the first fire it can be later today.
        let next = if self.last_fired == Some(now.date_naive()) {
            self.schedule.next_fire(now)
        } else if self.schedule.is_due(now, self.last_fired) {
            Some(now)
        } else {
            self.schedule.next_fire(now)
        };
        if let Some(next) = next {
            info!(next_fire = %next.format("%Y-%m-%d %H:%M"), "next restart scheduled");
        }
    }
}

fn short_id(id: &str) -> &str {
    &id[..id.len().min(12)]
}
