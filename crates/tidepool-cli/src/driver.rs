//! Synthetic load generation.
//!
//! Submits `jobs` sleeping jobs with at most `concurrency` admissions pending
//! at once, then waits for the admitted work to finish and shuts the pool
//! down. Cancelling `stop` ends submission early; jobs still queued at that
//! point are dropped by the shutdown.

use crate::config::RunConfig;
use core::{fmt, time::Duration};
use futures::{StreamExt, stream};
use tidepool::{BoxJob, Pool, PoolStats};
use tokio::time::{Instant, interval, sleep};
use tokio_util::sync::CancellationToken;

/// Polling period while waiting for admitted jobs to finish.
const DRAIN_TICK: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub admitted: usize,
    pub rejected: usize,
    /// Largest temporary registry size observed during submission.
    pub peak_temporary: usize,
    /// Pool state right before shutdown.
    pub stats: PoolStats,
    pub elapsed: Duration,
    pub interrupted: bool,
}

impl Report {
    pub fn submitted(&self) -> usize {
        self.admitted + self.rejected
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "submitted {} jobs in {:.3?}{}",
            self.submitted(),
            self.elapsed,
            if self.interrupted { " (interrupted)" } else { "" }
        )?;
        writeln!(f, "  admitted:           {}", self.admitted)?;
        writeln!(f, "  rejected:           {}", self.rejected)?;
        writeln!(f, "  eternal workers:    {}", self.stats.eternal_workers)?;
        writeln!(f, "  temporary workers:  {}", self.stats.temporary_workers)?;
        writeln!(f, "  peak temporary:     {}", self.peak_temporary)?;
        write!(f, "  load at shutdown:   {}", self.stats.load)
    }
}

pub async fn run(config: &RunConfig, stop: CancellationToken) -> anyhow::Result<Report> {
    let pool = Pool::new(config.pool)?;
    let job_duration = config.job_duration;
    let start = Instant::now();

    #[cfg(feature = "tracing")]
    tracing::info!(
        jobs = config.jobs,
        concurrency = config.concurrency,
        job_duration = ?job_duration,
        "Submitting jobs"
    );

    let (admitted, rejected, peak_temporary) = stream::iter(0..config.jobs)
        .map(|_| pool.do_job(BoxJob::new(sleep(job_duration))))
        .buffer_unordered(config.concurrency)
        .take_until(stop.cancelled())
        .fold((0, 0, 0), |(admitted, rejected, peak), ok| {
            let peak = peak.max(pool.temporary_count());
            async move {
                if ok {
                    (admitted + 1, rejected, peak)
                } else {
                    (admitted, rejected + 1, peak)
                }
            }
        })
        .await;

    let interrupted = stop.is_cancelled();
    if !interrupted {
        drain(&pool, &stop).await;
    }

    let report = Report {
        admitted,
        rejected,
        peak_temporary,
        stats: pool.stats(),
        elapsed: start.elapsed(),
        interrupted: stop.is_cancelled(),
    };

    pool.shutdown().await;
    Ok(report)
}

/// Waits until every admitted job has finished or `stop` fires.
async fn drain(pool: &Pool<BoxJob>, stop: &CancellationToken) {
    let mut tick = interval(DRAIN_TICK);
    loop {
        tokio::select! {
            () = stop.cancelled() => {
                #[cfg(feature = "tracing")]
                tracing::info!(load = pool.stats().load, "Drain interrupted");
                return;
            }
            _ = tick.tick() => {
                if pool.stats().load == 0 {
                    return;
                }
            }
        }
    }
}
