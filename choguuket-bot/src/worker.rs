use std::sync::Arc;
use std::time::Duration;

use choguuket_core::messaging::UpdateSource;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::intake::Intake;

const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Polls `source` until `shutdown` fires. Events of one batch run concurrently, at most
/// `max_in_flight` at a time, and the whole batch finishes before the next poll.
pub async fn run_intake_loop<S: UpdateSource>(
    mut source: S,
    intake: Intake,
    max_in_flight: usize,
    shutdown: CancellationToken,
) {
    let permits = Arc::new(Semaphore::new(max_in_flight.max(1)));
    info!("Intake loop started, up to {} events in flight", max_in_flight.max(1));

    loop {
        let batch = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            batch = source.next_batch() => batch,
        };

        let events = match batch {
            Ok(events) => events,
            Err(e) => {
                error!("Polling for updates failed: {}", e);
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = sleep(POLL_ERROR_BACKOFF) => continue,
                }
            }
        };
        if events.is_empty() {
            continue;
        }
        debug!("Processing batch of {} events", events.len());

        let mut tasks = JoinSet::new();
        for event in events {
            let intake = intake.clone();
            let permits = permits.clone();
            tasks.spawn(async move {
                // The semaphore is never closed.
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                if let Err(e) = intake.handle(event).await {
                    error!("Event handling stopped: {:#}", e);
                }
            });
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Event task panicked: {}", e);
            }
        }
    }

    if let Err(e) = source.confirm().await {
        warn!("Failed to confirm processed updates: {}", e);
    }
    info!("Intake loop stopped");
}
