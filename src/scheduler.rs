//! Re-evaluation loop
//!
//! A resolution pass reports the next instant at which some permission's
//! validity window opens or closes. The loop sleeps until then (clamped to
//! the configured interval bounds) and runs the next pass, so grants follow
//! their windows without polling.

use crate::config::SchedulerConfig;
use crate::grants::Resolution;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Time to wait before the next pass.
///
/// Waits until `next_transition`, but never less than the minimum interval
/// and never more than the refresh interval. With nothing scheduled the
/// refresh interval applies.
pub fn next_delay(
    now: DateTime<Utc>,
    next_transition: Option<DateTime<Utc>>,
    config: &SchedulerConfig,
) -> Duration {
    let min = config.min_interval();
    let max = config.refresh_interval().max(min);

    let Some(at) = next_transition else {
        return max;
    };

    // Negative spans do not convert; a past transition is simply due.
    let until = (at - now).to_std().unwrap_or(Duration::ZERO);
    until.clamp(min, max)
}

/// Outcome of one successful watch pass
#[derive(Debug, Clone)]
pub struct Pass {
    pub resolution: Resolution,
    /// Scheduler settings as loaded by this pass; they govern the next wait
    pub scheduler: SchedulerConfig,
}

/// Run passes until `shutdown` is cancelled.
///
/// `pass` is invoked with the instant to evaluate at. Each successful pass
/// returns the scheduler settings it loaded, which replace `scheduler` from
/// then on. A failing pass publishes nothing; the loop logs the error and
/// tries again after the current refresh interval, re-reading whatever input
/// `pass` loads.
pub async fn run_watch<F, Fut>(
    mut pass: F,
    mut scheduler: SchedulerConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<()>
where
    F: FnMut(DateTime<Utc>) -> Fut,
    Fut: Future<Output = anyhow::Result<Pass>>,
{
    info!(
        min_interval_secs = scheduler.min_interval_secs,
        refresh_interval_secs = scheduler.refresh_interval_secs,
        "Starting re-evaluation loop"
    );

    loop {
        let now = Utc::now();
        let delay = match pass(now).await {
            Ok(Pass {
                resolution,
                scheduler: loaded,
            }) => {
                if loaded != scheduler {
                    info!(
                        min_interval_secs = loaded.min_interval_secs,
                        refresh_interval_secs = loaded.refresh_interval_secs,
                        "Scheduler settings changed"
                    );
                    scheduler = loaded;
                }

                let delay = next_delay(now, resolution.next_transition, &scheduler);
                info!(
                    grants = resolution.grant_count(),
                    next_transition = ?resolution.next_transition,
                    sleep_secs = delay.as_secs(),
                    "Pass complete"
                );
                delay
            }
            Err(e) => {
                error!(error = %e, "Resolution pass failed, nothing published");
                scheduler.refresh_interval()
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.cancelled() => {
                info!("Re-evaluation loop stopped");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config() -> SchedulerConfig {
        SchedulerConfig {
            min_interval_secs: 5,
            refresh_interval_secs: 600,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_never_uses_refresh_interval() {
        assert_eq!(next_delay(now(), None, &config()), Duration::from_secs(600));
    }

    #[test]
    fn test_waits_until_transition() {
        let at = now() + chrono::Duration::seconds(42);
        assert_eq!(next_delay(now(), Some(at), &config()), Duration::from_secs(42));
    }

    #[test]
    fn test_clamped_to_bounds() {
        let soon = now() + chrono::Duration::seconds(1);
        assert_eq!(next_delay(now(), Some(soon), &config()), Duration::from_secs(5));

        let past = now() - chrono::Duration::hours(1);
        assert_eq!(next_delay(now(), Some(past), &config()), Duration::from_secs(5));

        let far = now() + chrono::Duration::days(30);
        assert_eq!(next_delay(now(), Some(far), &config()), Duration::from_secs(600));
    }
}
