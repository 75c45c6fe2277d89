//! Job dispatch: CRON loops, the queue listener, single-flight enforcement,
//! and the per-job runner with its webhook boundaries.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::Utc;
use cron::Schedule;
use sqlx::postgres::PgListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::config::schedule_disabled;
use crate::ingest::changes_sync::changes_sync;
use crate::ingest::missing::{prune_deleted, update_missing_ids};
use crate::ingest::sweep::full_sweep;
use crate::ingest::upsert::{refresh_movie, refresh_series, Refresh};
use crate::jobs::queue::JobLock;
use crate::jobs::JobKind;
use crate::schema;
use crate::JobContext;

const QUEUE_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Parse a 5-field CRON expression, or None when the value is a disable
/// token. The parser wants a seconds column, so one is prepended; schedules
/// fire at second zero.
pub fn parse_schedule(raw: &str) -> Result<Option<Schedule>> {
    if schedule_disabled(raw) {
        return Ok(None);
    }
    let trimmed = raw.trim();
    let normalized = if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_string()
    };
    Schedule::from_str(&normalized)
        .map(Some)
        .map_err(|err| anyhow!("invalid cron expression {raw:?}: {err}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Started,
    AlreadyRunning,
}

/// Removes the key from the running set when the job ends, however it ends.
struct RunningGuard {
    set: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.key);
        }
    }
}

#[derive(Clone)]
pub struct Scheduler {
    ctx: JobContext,
    cancel: CancellationToken,
    running: Arc<Mutex<HashSet<String>>>,
    tracker: TaskTracker,
}

impl Scheduler {
    pub fn new(ctx: JobContext, cancel: CancellationToken) -> Self {
        Self {
            ctx,
            cancel,
            running: Arc::new(Mutex::new(HashSet::new())),
            tracker: TaskTracker::new(),
        }
    }

    /// Register the four configured schedules. Returns how many are active.
    pub fn spawn_cron_jobs(&self) -> Result<usize> {
        let entries = [
            ("full sweep", self.ctx.cfg.cron_full_sweep.clone(), JobKind::FullSweep { force: false }),
            ("missing ids", self.ctx.cfg.cron_missing_only.clone(), JobKind::MissingIds),
            ("prune", self.ctx.cfg.cron_prune.clone(), JobKind::PruneDeleted),
            ("changes sync", self.ctx.cfg.cron_changes_sync.clone(), JobKind::ChangesSync),
        ];
        let mut active = 0;
        for (label, raw, kind) in entries {
            match parse_schedule(&raw)? {
                Some(schedule) => {
                    info!(task = label, cron = %raw, "schedule registered");
                    self.spawn_cron(schedule, kind);
                    active += 1;
                }
                None => info!(task = label, "schedule disabled"),
            }
        }
        Ok(active)
    }

    fn spawn_cron(&self, schedule: Schedule, kind: JobKind) {
        let scheduler = self.clone();
        let cancel = self.cancel.clone();
        self.tracker.spawn(async move {
            loop {
                let Some(next) = schedule.upcoming(Utc).next() else {
                    break;
                };
                let delay = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
                if let Err(err) = scheduler.dispatch(kind.clone()).await {
                    error!(job = kind.name(), error = %err, "scheduled dispatch failed");
                }
            }
        });
    }

    /// Start a job unless its single-flight key is already held.
    pub async fn dispatch(&self, kind: JobKind) -> Result<Dispatch> {
        let guard = match kind.lock_key() {
            Some(key) => {
                let mut running = self
                    .running
                    .lock()
                    .map_err(|_| anyhow!("running-set lock poisoned"))?;
                if !running.insert(key.clone()) {
                    warn!(job = kind.name(), key = %key, "job already running; rejecting duplicate");
                    return Ok(Dispatch::AlreadyRunning);
                }
                drop(running);
                Some(RunningGuard {
                    set: self.running.clone(),
                    key,
                })
            }
            None => None,
        };

        // Cross-process guard for the global jobs.
        let pg_lock = if kind.is_global() {
            match JobLock::try_acquire(&self.ctx.cfg.database_uri, kind.name()).await? {
                Some(lock) => Some(lock),
                None => {
                    warn!(job = kind.name(), "job already running in another process; rejecting");
                    return Ok(Dispatch::AlreadyRunning);
                }
            }
        } else {
            None
        };

        let ctx = self.ctx.clone();
        let cancel = self.cancel.child_token();
        self.tracker.spawn(async move {
            let _guard = guard;
            let _pg_lock = pg_lock;
            run_job(&ctx, kind, cancel).await;
        });
        Ok(Dispatch::Started)
    }

    /// LISTEN on the queue channel and drain jobs; reconnects with backoff.
    pub async fn run_queue_loop(&self) {
        let mut backoff = 1u64;
        loop {
            if self.cancel.is_cancelled() {
                return;
            }
            match self.listen_once().await {
                Ok(()) => return, // cancelled
                Err(err) => {
                    warn!(error = %err, backoff_s = backoff, "job queue listener failed; reconnecting");
                    tokio::select! {
                        _ = self.cancel.cancelled() => return,
                        _ = tokio::time::sleep(Duration::from_secs(backoff)) => {}
                    }
                    backoff = (backoff * 2).min(30);
                }
            }
        }
    }

    async fn listen_once(&self) -> Result<()> {
        let mut listener = PgListener::connect_with(&self.ctx.db.pool).await?;
        listener.listen("new_job").await?;
        info!("listening for new jobs");

        // Anything enqueued before the LISTEN started.
        self.drain_queue().await?;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                next = tokio::time::timeout(QUEUE_POLL_INTERVAL, listener.recv()) => {
                    match next {
                        Ok(Ok(_notification)) => self.drain_queue().await?,
                        Ok(Err(err)) => return Err(err.into()),
                        // Poll fallback for notifications lost to reconnects.
                        Err(_elapsed) => self.drain_queue().await?,
                    }
                }
            }
        }
    }

    async fn drain_queue(&self) -> Result<()> {
        loop {
            let row: Option<(String, Option<String>)> = sqlx::query_as(
                "DELETE FROM job_queue WHERE id = (\
                     SELECT id FROM job_queue ORDER BY id FOR UPDATE SKIP LOCKED LIMIT 1\
                 ) RETURNING job_type, payload",
            )
            .fetch_optional(&self.ctx.db.pool)
            .await?;
            let Some((job_type, payload)) = row else {
                return Ok(());
            };
            match JobKind::parse(&job_type, payload.as_deref()) {
                Some(kind) => {
                    let _ = self.dispatch(kind).await?;
                }
                None => warn!(job_type = %job_type, ?payload, "ignoring unknown job"),
            }
        }
    }

    /// Cancel everything and wait up to `grace` for jobs to drain.
    pub async fn shutdown(&self, grace: Duration) {
        self.cancel.cancel();
        self.tracker.close();
        info!(grace_s = grace.as_secs(), "draining running jobs");
        if tokio::time::timeout(grace, self.tracker.wait()).await.is_err() {
            warn!("grace period expired with jobs still running; exiting anyway");
        }
    }
}

async fn run_job(ctx: &JobContext, kind: JobKind, cancel: CancellationToken) {
    let started = std::time::Instant::now();
    info!(job = kind.name(), "job started");

    let outcome = match kind.clone() {
        JobKind::FullSweep { force } => run_full_sweep(ctx, force, &cancel).await,
        JobKind::MissingIds => run_missing_ids(ctx, &cancel).await,
        JobKind::PruneDeleted => run_prune(ctx, &cancel).await,
        JobKind::ChangesSync => run_changes_sync(ctx, &cancel).await,
        JobKind::CreateTables => schema::create_live_tables(&ctx.db).await,
        JobKind::AddMovie(id) => run_add(ctx, JobKind::AddMovie(id), &cancel).await,
        JobKind::AddSeries(id) => run_add(ctx, JobKind::AddSeries(id), &cancel).await,
        JobKind::TestWebhook(message) => {
            ctx.notifier.send(&message).await;
            Ok(())
        }
    };

    match outcome {
        Ok(()) => info!(
            job = kind.name(),
            elapsed_s = started.elapsed().as_secs(),
            "job finished"
        ),
        Err(err) => {
            error!(job = kind.name(), error = %format!("{err:#}"), "job failed");
            ctx.notifier
                .send(&format!(
                    "**TMDB mirror error in {}:**  \n```{err:#}```",
                    kind.name()
                ))
                .await;
        }
    }
}

async fn run_full_sweep(ctx: &JobContext, force: bool, cancel: &CancellationToken) -> Result<()> {
    ctx.notifier.send("**TMDB mirror:** running full sweep.").await;
    let report = full_sweep(ctx, force, cancel).await?;
    if report.error_ratio() > 0.05 {
        ctx.notifier
            .send(&format!(
                "**TMDB mirror warning:** full sweep finished with {:.1}% of ids failing.",
                report.error_ratio() * 100.0
            ))
            .await;
    }
    ctx.notifier
        .send(&format!("**TMDB mirror:** full sweep completed. {}", report.summary()))
        .await;
    Ok(())
}

async fn run_missing_ids(ctx: &JobContext, cancel: &CancellationToken) -> Result<()> {
    ctx.notifier.send("**TMDB mirror:** running missing ids sweep.").await;
    let report = update_missing_ids(ctx, cancel).await?;
    ctx.notifier
        .send(&format!(
            "**TMDB mirror:** missing ids sweep completed. {}",
            report.summary()
        ))
        .await;
    Ok(())
}

async fn run_prune(ctx: &JobContext, cancel: &CancellationToken) -> Result<()> {
    ctx.notifier.send("**TMDB mirror:** running prune task.").await;
    let report = prune_deleted(ctx, cancel).await?;
    ctx.notifier
        .send(&format!("**TMDB mirror:** prune task completed. {}", report.summary()))
        .await;
    Ok(())
}

async fn run_changes_sync(ctx: &JobContext, cancel: &CancellationToken) -> Result<()> {
    let report = changes_sync(ctx, cancel).await?;
    ctx.notifier
        .send(&format!(
            "**TMDB mirror:** changes sync completed. {}",
            report.summary()
        ))
        .await;
    Ok(())
}

async fn run_add(ctx: &JobContext, kind: JobKind, cancel: &CancellationToken) -> Result<()> {
    let (id, outcome) = match kind {
        JobKind::AddMovie(id) => (id, refresh_movie(ctx, id, cancel).await?),
        JobKind::AddSeries(id) => (id, refresh_series(ctx, id, cancel).await?),
        _ => unreachable!("run_add called with a non-add job"),
    };
    match outcome {
        Refresh::Applied => info!(id, "record ingested"),
        Refresh::NotFound => warn!(id, "upstream returned 404; nothing ingested"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_field_expressions_parse() {
        assert!(parse_schedule("0 3 * * *").unwrap().is_some());
        assert!(parse_schedule("*/15 * * * *").unwrap().is_some());
        assert!(parse_schedule("30 2 * * 1-5").unwrap().is_some());
    }

    #[test]
    fn disable_tokens_yield_no_schedule() {
        for token in ["", "false", "OFF", "Disable", "disabled", "NO"] {
            assert!(parse_schedule(token).unwrap().is_none(), "token {token:?}");
        }
    }

    #[test]
    fn invalid_expressions_error() {
        assert!(parse_schedule("not a cron").is_err());
        assert!(parse_schedule("99 99 * * *").is_err());
    }

    #[test]
    fn schedules_produce_future_fire_times() {
        let schedule = parse_schedule("0 3 * * *").unwrap().unwrap();
        let next = schedule.upcoming(Utc).next().unwrap();
        assert!(next > Utc::now());
    }
}
