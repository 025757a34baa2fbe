//! Background jobs scheduled at startup. Jobs are fault-tolerant: a failed
//! run logs and waits for the next tick rather than aborting the scheduler.

pub mod quote_cache_warm_job;

use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::errors::AppError;
use crate::state::AppState;

const QUOTE_WARM_SCHEDULE: &str = "0 */15 * * * *";

pub async fn start(state: AppState) -> Result<JobScheduler, AppError> {
    let scheduler = JobScheduler::new()
        .await
        .map_err(|e| AppError::External(format!("Failed to create scheduler: {e}")))?;

    let job_state = state.clone();
    let job = Job::new_async(QUOTE_WARM_SCHEDULE, move |_uuid, _lock| {
        let state = job_state.clone();
        Box::pin(async move {
            if let Err(e) = quote_cache_warm_job::run(&state).await {
                error!("Quote cache warm job failed: {}", e);
            }
        })
    })
    .map_err(|e| AppError::External(format!("Failed to create quote warm job: {e}")))?;

    scheduler
        .add(job)
        .await
        .map_err(|e| AppError::External(format!("Failed to schedule quote warm job: {e}")))?;

    scheduler
        .start()
        .await
        .map_err(|e| AppError::External(format!("Failed to start scheduler: {e}")))?;

    info!("Job scheduler started (quote cache warm every 15 minutes)");
    Ok(scheduler)
}
