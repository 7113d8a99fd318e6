//! Bounded concurrent dispatch of top-level fetches

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use url::Url;

use super::fetch::{FetchError, ManifestFetcher};
use crate::plugins::Manifest;

/// Result of fetching one location
#[derive(Debug)]
pub struct FetchOutcome {
    pub url: Url,
    pub result: Result<Manifest, FetchError>,
}

/// Fetch every URL with at most `limit` requests in flight.
///
/// A permit is taken before a unit is spawned and released after it has
/// delivered its result, so a `limit` of 1 is strictly sequential. Every unit
/// is started regardless of earlier failures, and the call returns once each
/// started unit has reported. Outcomes arrive in completion order.
pub async fn dispatch(
    fetcher: &ManifestFetcher,
    urls: Vec<Url>,
    limit: usize,
    cancel: &CancellationToken,
) -> Vec<FetchOutcome> {
    let total = urls.len();
    if total == 0 {
        return Vec::new();
    }

    let gate = Arc::new(Semaphore::new(limit.max(1)));
    let (tx, mut rx) = mpsc::channel::<FetchOutcome>(total);

    let mut started = 0;
    for url in urls {
        let Ok(permit) = gate.clone().acquire_owned().await else {
            break;
        };

        let tx = tx.clone();
        let fetcher = fetcher.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let result = fetcher.fetch(&url, &cancel).await;
            let _ = tx.send(FetchOutcome { url, result }).await;
            drop(permit);
        });
        started += 1;
    }
    drop(tx);

    let mut outcomes = Vec::with_capacity(started);
    while outcomes.len() < started {
        match rx.recv().await {
            Some(outcome) => outcomes.push(outcome),
            None => {
                warn!(
                    "Plugin fetch workers exited early: {} of {} results collected",
                    outcomes.len(),
                    started
                );
                break;
            }
        }
    }

    outcomes
}
