use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use tidepool::{MIN_WORKERS, PoolConfig, SampleMode, RetryPolicy};

fn default_worker_count() -> usize {
    num_cpus::get().max(MIN_WORKERS)
}

/// Runtime configuration for the `tidepool` binary.
///
/// The pool settings map one-to-one onto [`PoolConfig`]; the remaining
/// settings shape the synthetic load that is driven through it. All values are
/// parsed from CLI arguments or environment variables (a `.env` file is loaded
/// first).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "tidepool",
    version,
    about = "Drives synthetic load through an elastic worker pool"
)]
pub struct CliArgs {
    /// Number of eternal workers started with the pool. Must be at least 2.
    ///
    /// Environment variable: `WORKER_COUNT`
    #[arg(long, env = "WORKER_COUNT", default_value_t = default_worker_count())]
    pub worker_count: usize,

    /// Maximum queued plus in-flight jobs per worker.
    ///
    /// Environment variable: `WORKER_CAPACITY`
    #[arg(long, env = "WORKER_CAPACITY", default_value_t = tidepool::DEFAULT_CAPACITY)]
    pub capacity: usize,

    /// Lifetime of a temporary worker, in seconds.
    ///
    /// Environment variable: `TEMPORARY_EXPIRY_SECS`
    #[arg(long, env = "TEMPORARY_EXPIRY_SECS", default_value_t = 30)]
    pub expiry_secs: u64,

    /// Timed samples taken per registry before escalating.
    ///
    /// Environment variable: `RETRY_ATTEMPTS`
    #[arg(long, env = "RETRY_ATTEMPTS", default_value_t = tidepool::DEFAULT_RETRY_ATTEMPTS)]
    pub retry_attempts: usize,

    /// Delay before each timed sample, in milliseconds.
    ///
    /// Environment variable: `RETRY_INTERVAL_MS`
    #[arg(long, env = "RETRY_INTERVAL_MS", default_value_t = 1000)]
    pub retry_interval_ms: u64,

    /// Stop retrying at the first admissible sample instead of waiting out
    /// every attempt.
    ///
    /// Environment variable: `FIRST_ADMISSIBLE`
    #[arg(long, env = "FIRST_ADMISSIBLE", default_value_t = false)]
    pub first_admissible: bool,

    /// Total number of jobs to submit.
    ///
    /// Environment variable: `JOBS`
    #[arg(long, env = "JOBS", default_value_t = 1000)]
    pub jobs: usize,

    /// How long each synthetic job sleeps, in milliseconds.
    ///
    /// Environment variable: `JOB_MILLIS`
    #[arg(long, env = "JOB_MILLIS", default_value_t = 50)]
    pub job_millis: u64,

    /// Maximum number of `do_job` calls awaiting admission at once.
    ///
    /// Environment variable: `CONCURRENCY`
    #[arg(long, env = "CONCURRENCY", default_value_t = 64)]
    pub concurrency: usize,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub pool: PoolConfig,
    pub jobs: usize,
    pub job_duration: Duration,
    pub concurrency: usize,
}

impl TryFrom<CliArgs> for RunConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.worker_count < MIN_WORKERS {
            bail!(
                "WORKER_COUNT ({}) must be at least {}",
                args.worker_count,
                MIN_WORKERS
            );
        }

        if args.capacity == 0 {
            bail!("WORKER_CAPACITY must be greater than 0");
        }

        if args.concurrency == 0 {
            bail!("CONCURRENCY must be greater than 0");
        }

        let mode = if args.first_admissible {
            SampleMode::FirstAdmissible
        } else {
            SampleMode::LastAttempt
        };
        let retry = RetryPolicy {
            attempts: args.retry_attempts,
            interval: Duration::from_millis(args.retry_interval_ms),
            mode,
        };

        Ok(Self {
            pool: PoolConfig::new(
                args.worker_count,
                args.capacity,
                Duration::from_secs(args.expiry_secs),
            )
            .with_retry(retry),
            jobs: args.jobs,
            job_duration: Duration::from_millis(args.job_millis),
            concurrency: args.concurrency,
        })
    }
}
