use chrono::Local;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{error, info};

use crate::db::batches;

/// Background job keeping every active batch's semester bookkeeping in step
/// with the calendar, so the July and January rollovers need no admin
/// action.
pub async fn start_semester_refresh_job(pool: PgPool) {
    info!("Starting batch semester refresh background job");

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(24 * 3600)); // Run daily

        loop {
            interval.tick().await;

            let today = Local::now().date_naive();
            match batches::refresh_active_batches(&pool, today).await {
                Ok(0) => {}
                Ok(updated) => info!("Rolled {} batch(es) into their current semester", updated),
                Err(e) => error!("Failed to refresh batch semesters: {}", e),
            }
        }
    });
}
