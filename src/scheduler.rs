//! Startup retry and the periodic scan loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::ledger::Ledger;
use crate::scan::{CycleReport, Scanner};

/// Open the ledger and ping it, retrying with a fixed delay.
///
/// Gives up after `attempts` tries with `Error::StoreUnavailable` carrying
/// the last failure.
pub async fn wait_for_store<L, F>(mut open: F, attempts: u32, delay: Duration) -> Result<L>
where
    L: Ledger,
    F: FnMut() -> Result<L>,
{
    let attempts = attempts.max(1);
    let mut last = String::new();

    for attempt in 1..=attempts {
        match open().and_then(|ledger| ledger.ping().map(|_| ledger)) {
            Ok(ledger) => {
                info!(attempt, "ledger is ready");
                return Ok(ledger);
            }
            Err(e) => {
                warn!(attempt, attempts, error = %e, "ledger not ready");
                last = e.to_string();
            }
        }

        if attempt < attempts {
            time::sleep(delay).await;
        }
    }

    Err(Error::StoreUnavailable {
        attempts,
        reason: last,
    })
}

/// Run one cycle on the blocking pool.
pub async fn run_once(scanner: Arc<Scanner>) -> Result<CycleReport> {
    tokio::task::spawn_blocking(move || scanner.run_cycle())
        .await
        .map_err(|e| Error::Task(e.to_string()))?
}

/// Scan immediately, then every `every` until `shutdown` resolves.
///
/// Each cycle is awaited before the next tick is taken, and ticks missed
/// while a slow cycle ran are skipped rather than replayed. Cycle errors are
/// logged; the loop keeps going. A zero period is rejected up front.
pub async fn run<S>(scanner: Arc<Scanner>, every: Duration, shutdown: S) -> Result<()>
where
    S: Future<Output = ()>,
{
    if every.is_zero() {
        return Err(Error::config("interval must be greater than zero"));
    }

    let mut ticker = time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    info!(interval = %humantime::format_duration(every), "scheduler started");

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown requested, scheduler stopping");
                return Ok(());
            }
            _ = ticker.tick() => {
                match run_once(scanner.clone()).await {
                    Ok(_) => {}
                    Err(Error::CycleInProgress) => warn!("previous scan cycle still running, skipping tick"),
                    Err(e) => error!(error = %e, "scan cycle failed"),
                }
            }
        }
    }
}
