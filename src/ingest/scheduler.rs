// src/ingest/scheduler.rs
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use chrono_tz::Tz;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::config::ScheduleConfig;
use crate::ingest::Pipeline;

/// Accept classic five-field cron (minute first) by pinning seconds to 0.
pub fn normalize_cron(expr: &str) -> Result<String> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    match fields.len() {
        5 => Ok(format!("0 {}", fields.join(" "))),
        6 | 7 => Ok(fields.join(" ")),
        n => bail!("cron expression {expr:?} has {n} fields, expected 5, 6 or 7"),
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| anyhow!("invalid timezone {name:?}: {e}"))
}

/// Recurring trigger for [`Pipeline::run`] in a fixed time zone.
///
/// Nothing fires until [`IngestScheduler::start`]. Once
/// [`IngestScheduler::stop`] returns, any triggered run has finished and no
/// new one will begin. Overlapping triggers are absorbed by the pipeline's run
/// lock.
pub struct IngestScheduler {
    sched: JobScheduler,
    cron: String,
    tz: Tz,
    /// `true` once stopped. Jobs hold a read guard for the whole run.
    halted: Arc<RwLock<bool>>,
}

impl IngestScheduler {
    pub async fn new(pipeline: Arc<Pipeline>, cfg: &ScheduleConfig) -> Result<Self> {
        let tz = parse_timezone(&cfg.timezone)?;
        let cron = normalize_cron(&cfg.cron)?;

        let halted = Arc::new(RwLock::new(false));
        let sched = JobScheduler::new().await.context("creating scheduler")?;
        let gate = halted.clone();
        let job = Job::new_async_tz(cron.as_str(), tz, move |_id, _sched| {
            let pipeline = pipeline.clone();
            let gate = gate.clone();
            Box::pin(async move {
                let halted = gate.read().await;
                if *halted {
                    return;
                }
                tracing::info!(
                    target: "ingest",
                    local_time = %Utc::now().with_timezone(&tz).format("%Y-%m-%d %H:%M:%S"),
                    "scheduled run triggered"
                );
                pipeline.run().await;
            })
        })
        .with_context(|| format!("creating ingest job for cron {cron:?}"))?;
        sched.add(job).await.context("adding ingest job")?;

        Ok(Self {
            sched,
            cron,
            tz,
            halted,
        })
    }

    pub fn cron(&self) -> &str {
        &self.cron
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub async fn start(&self) -> Result<()> {
        self.sched.start().await.context("starting scheduler")?;
        tracing::info!(target: "ingest", cron = %self.cron, timezone = %self.tz, "scheduler started");
        Ok(())
    }

    /// Waits for a triggered run to finish, then shuts the scheduler down.
    pub async fn stop(&mut self) -> Result<()> {
        *self.halted.write().await = true;
        self.sched.shutdown().await.context("stopping scheduler")?;
        tracing::info!(target: "ingest", "scheduler stopped");
        Ok(())
    }
}
