use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, NaiveTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::bot::broadcast::send_batch_to_channel;
use crate::bot::polling::wait_for_shutdown;
use crate::bot::{BatchOrigin, BotContext};

const DEFAULT_TOPIC: &str = "Geral";

/// A daily automatic batch: post `topic` when the local clock reads `time`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub time: NaiveTime,
    pub topic: String,
}

impl ScheduleEntry {
    pub fn new(time: NaiveTime, topic: &str) -> Self {
        let topic = match topic.trim() {
            "" => DEFAULT_TOPIC,
            t => t,
        };
        Self {
            time,
            topic: topic.to_string(),
        }
    }

    pub fn job_name(&self) -> String {
        format!("auto_{}", self.topic)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    entries: Vec<ScheduleEntry>,
}

impl Schedule {
    pub fn new(entries: Vec<ScheduleEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    /// Named jobs, `auto_{topic}`, in schedule order.
    pub fn jobs(&self) -> impl Iterator<Item = (String, &ScheduleEntry)> {
        self.entries.iter().map(|entry| (entry.job_name(), entry))
    }
}

/// The first instant strictly after `now` at which the wall clock at `offset` reads `time`.
pub fn next_run(now: DateTime<Utc>, time: NaiveTime, offset: FixedOffset) -> DateTime<Utc> {
    let local_date = now.with_timezone(&offset).date_naive();
    let local_candidate = local_date.and_time(time);
    let mut candidate =
        (local_candidate - ChronoDuration::seconds(offset.local_minus_utc().into())).and_utc();
    while candidate <= now {
        candidate += ChronoDuration::days(1);
    }
    candidate
}

async fn run_daily_job(
    ctx: Arc<BotContext>,
    name: String,
    entry: ScheduleEntry,
    offset: FixedOffset,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let now = Utc::now();
        let next = next_run(now, entry.time, offset);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        info!(job = %name, next_run = %next.with_timezone(&offset), "Next automatic batch scheduled.");

        tokio::select! {
            _ = wait_for_shutdown(&mut shutdown) => break,
            _ = tokio::time::sleep(wait) => {}
        }

        if let Err(e) =
            send_batch_to_channel(&ctx, &entry.topic, BatchOrigin::Automatic, ctx.batch_size).await
        {
            error!(job = %name, error = %e, "Automatic batch failed.");
        }
    }
    info!(job = %name, "Automatic job stopped.");
}

/// Starts one task per schedule entry. Each task exits when `shutdown` flips.
pub fn spawn_daily_jobs(
    ctx: Arc<BotContext>,
    schedule: &Schedule,
    offset: FixedOffset,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    schedule
        .jobs()
        .map(|(name, entry)| {
            info!(
                topic = %entry.topic,
                time = %entry.time.format("%H:%M"),
                "Scheduling automatic batch."
            );
            tokio::spawn(run_daily_job(
                Arc::clone(&ctx),
                name,
                entry.clone(),
                offset,
                shutdown.clone(),
            ))
        })
        .collect()
}
