use std::sync::Arc;

use sqlx::SqlitePool;

use crate::services::SyncService;
use crate::vle::VleClient;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub vle: Arc<dyn VleClient>,
    pub sync: Arc<SyncService>,
}

impl AppState {
    pub fn new(db: SqlitePool, vle: Arc<dyn VleClient>) -> Self {
        let sync = Arc::new(SyncService::new(db.clone(), vle.clone()));
        Self { db, vle, sync }
    }
}
