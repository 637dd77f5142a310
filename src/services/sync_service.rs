use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::AppError;
use crate::sync::{MasterCourseLevel, SyncStats, reconcile};
use crate::vle::{MasterCourseItem, VleClient};

pub const SYNC_SUCCESS_MESSAGE: &str = "Full course synchronization completed successfully";

/// Drives a full sync of the course tree from the VLE.
///
/// One instance is shared by the scheduler and the HTTP handler; runs are
/// serialized so two syncs never interleave their reads and deletes.
pub struct SyncService {
    db: SqlitePool,
    vle: Arc<dyn VleClient>,
    lock: Mutex<()>,
}

#[derive(Debug, Serialize)]
pub struct SyncReport {
    pub message: String,
    /// Absent when the snapshot could not be fetched.
    pub stats: Option<SyncStats>,
}

impl SyncService {
    pub fn new(db: SqlitePool, vle: Arc<dyn VleClient>) -> Self {
        Self {
            db,
            vle,
            lock: Mutex::new(()),
        }
    }

    /// Fetches the snapshot and reconciles it.
    ///
    /// A VLE failure is not an error: its message becomes the report message.
    /// Database failures abort the run and propagate.
    pub async fn full_sync(&self) -> Result<SyncReport, AppError> {
        let _guard = self.lock.lock().await;
        info!("Starting full course sync...");

        let items = match self.vle.fetch_snapshot().await {
            Ok(items) => items,
            Err(AppError::Upstream(message)) => {
                warn!("Full course sync aborted: {}", message);
                return Ok(SyncReport { message, stats: None });
            }
            Err(e) => return Err(e),
        };
        info!("Fetched {} master courses from VLE", items.len());

        let stats = self.apply_snapshot(&items).await?;
        Ok(SyncReport {
            message: SYNC_SUCCESS_MESSAGE.to_string(),
            stats: Some(stats),
        })
    }

    /// Reconciles an already fetched snapshot.
    pub async fn sync_all_courses(&self, items: &[MasterCourseItem]) -> Result<SyncStats, AppError> {
        let _guard = self.lock.lock().await;
        self.apply_snapshot(items).await
    }

    async fn apply_snapshot(&self, items: &[MasterCourseItem]) -> Result<SyncStats, AppError> {
        let mut conn = self.db.acquire().await?;
        let mut stats = SyncStats::default();

        reconcile(&MasterCourseLevel, &mut *conn, &(), items, &mut stats).await?;

        info!(
            "Sync completed - master courses: {:?} | scheduled courses: {:?} | groups: {:?}",
            stats.master_courses, stats.scheduled_courses, stats.groups
        );
        Ok(stats)
    }
}
