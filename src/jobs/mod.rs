use crate::{context::AppContext, metrics};
use std::{sync::Arc, time::Instant};
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<AppContext>,
    started: Instant,
}

impl JobScheduler {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self {
            context,
            started: Instant::now(),
        }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        tokio::spawn(Self::expired_rejection_purge_job(Arc::clone(&self)));
        tokio::spawn(Self::queue_depth_job(Arc::clone(&self)));
        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Delete rejected records past retention
    async fn expired_rejection_purge_job(scheduler: Arc<Self>) {
        let period = scheduler.context.config.retention.purge_interval_secs.max(1);
        let mut interval = interval(Duration::from_secs(period));

        loop {
            interval.tick().await;
            let started = Instant::now();

            match tasks::purge_expired_rejections(&scheduler.context).await {
                Ok(count) => {
                    metrics::record_background_job("purge_expired", "success", started.elapsed().as_secs_f64());
                    if count > 0 {
                        info!("Purged {} expired rejected records", count);
                    } else {
                        debug!("Rejection purge: nothing expired");
                    }
                }
                Err(e) => {
                    metrics::record_background_job("purge_expired", "failure", started.elapsed().as_secs_f64());
                    error!("Failed to purge expired rejections: {}", e);
                }
            }
        }
    }

    /// Refresh the queue gauge and uptime (runs every minute)
    async fn queue_depth_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(60));

        loop {
            interval.tick().await;
            metrics::UPTIME_SECONDS.set(scheduler.started.elapsed().as_secs_f64());

            if let Err(e) = tasks::refresh_queue_depth(&scheduler.context).await {
                error!("Failed to refresh queue depth: {}", e);
            }
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300));

        loop {
            interval.tick().await;

            if let Err(e) = tasks::health_check(&scheduler.context).await {
                error!("Health check failed: {}", e);
            }
        }
    }
}
