use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use tracing::{info, warn};

use crate::services::sync_service::SyncService;

/// Runs the full sync at fixed local times of day.
pub struct SyncScheduler {
    service: Arc<SyncService>,
    times: Vec<NaiveTime>,
}

impl SyncScheduler {
    pub fn new(service: Arc<SyncService>, times: Vec<NaiveTime>) -> Self {
        Self { service, times }
    }

    /// Sleeps until each configured time and syncs, forever.
    pub async fn start(self) {
        info!("Starting sync scheduler (times: {:?})", self.times);

        loop {
            let now = Local::now().naive_local();
            let Some(next) = next_run_after(now, &self.times) else {
                warn!("Sync scheduler has no run times configured, stopping");
                return;
            };

            let wait = (next - now).to_std().unwrap_or_default();
            info!("Next full sync at {}", next);
            tokio::time::sleep(wait).await;

            match self.service.full_sync().await {
                Ok(report) => match report.stats {
                    Some(stats) => info!("Scheduled sync finished: {} ({:?})", report.message, stats),
                    None => warn!("Scheduled sync skipped: {}", report.message),
                },
                Err(e) => {
                    // keep the schedule going
                    warn!("Scheduled sync failed: {:?}", e);
                }
            }
        }
    }
}

/// The first configured time strictly after `now`, rolling into tomorrow.
pub fn next_run_after(now: NaiveDateTime, times: &[NaiveTime]) -> Option<NaiveDateTime> {
    let today = now.date();
    let later_today = times
        .iter()
        .map(|t| today.and_time(*t))
        .filter(|candidate| *candidate > now)
        .min();

    later_today.or_else(|| {
        let tomorrow = today + ChronoDuration::days(1);
        times.iter().min().map(|t| tomorrow.and_time(*t))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_next_run_later_today() {
        let times = vec![hm(6, 0), hm(22, 0)];
        assert_eq!(next_run_after(at(2026, 10, 16, 12, 30), &times), Some(at(2026, 10, 16, 22, 0)));
        assert_eq!(next_run_after(at(2026, 10, 16, 5, 59), &times), Some(at(2026, 10, 16, 6, 0)));
    }

    #[test]
    fn test_next_run_rolls_over_midnight() {
        let times = vec![hm(22, 0), hm(6, 0)];
        assert_eq!(next_run_after(at(2026, 12, 31, 22, 0), &times), Some(at(2027, 1, 1, 6, 0)));
    }

    #[test]
    fn test_next_run_without_times() {
        assert_eq!(next_run_after(at(2026, 10, 16, 12, 0), &[]), None);
    }
}
