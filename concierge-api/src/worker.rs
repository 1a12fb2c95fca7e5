use chrono::Utc;
use concierge_desk::Reservations;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

/// Cancels lapsed tentative holds every `every_seconds`.
pub async fn start_sweep_worker(reservations: Reservations, every_seconds: u64) {
    let mut ticker = interval(Duration::from_secs(every_seconds.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Tentative sweep worker started, every {}s", every_seconds);

    loop {
        ticker.tick().await;
        match reservations.sweep_expired(Utc::now()).await {
            Ok(report) if report.cancelled.is_empty() && report.failed == 0 => {}
            Ok(report) => info!(
                cancelled = report.cancelled.len(),
                failed = report.failed,
                emails_failed = report.emails_failed,
                "Tentative sweep finished"
            ),
            Err(e) => error!("Tentative sweep failed: {}", e),
        }
    }
}
