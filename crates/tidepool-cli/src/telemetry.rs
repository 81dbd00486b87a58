//! Console logging for the `tidepool` binary.
//!
//! Events from the pool are emitted only when the `tracing` feature is on
//! (it is by default). The subscriber is installed either way so that
//! `RUST_LOG` behaves consistently.
//!
//! ```bash
//! RUST_LOG=tidepool=debug cargo run -p tidepool-cli -- --jobs 200
//! ```

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true)
                .pretty(),
        )
        .try_init()?;

    Ok(())
}
