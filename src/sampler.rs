use futures::{stream, StreamExt};
use log::{debug, info, warn};

use crate::{
    fetcher::{FetchResult, Fetcher},
    store::Store,
    structures::{errors::SitemetersError, model::Site},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassSummary {
    NothingToMeasure,
    Completed { attempted: usize, recorded: usize },
}

impl PassSummary {
    pub fn message(&self) -> &'static str {
        match self {
            PassSummary::NothingToMeasure => "No sites are registered; nothing to measure.",
            PassSummary::Completed { .. } => "Measurement pass completed.",
        }
    }
}

/// Fetches every registered site once and records the successful ones.
///
/// Individual fetch or write failures are logged and skipped; only failing to
/// list the sites aborts the pass.
pub async fn run_sampling_pass(
    store: &dyn Store,
    fetcher: &dyn Fetcher,
    concurrency: usize,
) -> Result<PassSummary, SitemetersError> {
    let sites = store.list_sites().await?;
    if sites.is_empty() {
        info!("No sites registered, skipping measurement pass");
        return Ok(PassSummary::NothingToMeasure);
    }

    let results = stream::iter(sites)
        .map(|site| async move {
            let result = fetcher.fetch(&site.permalink).await;
            (site, result)
        })
        .buffered(concurrency.max(1))
        .collect::<Vec<(Site, FetchResult)>>()
        .await;

    let attempted = results.len();
    let mut recorded = 0;
    for (site, result) in results {
        if !result.ok {
            debug!("Skipping {}: status {:?}", site.name, result.status);
            continue;
        }
        match store
            .record_measurement(&site.name, result.elapsed_seconds)
            .await
        {
            Ok(_) => recorded += 1,
            Err(e) => warn!("Failed to record measurement for {}: {}", site.name, e),
        }
    }

    info!(
        "Measurement pass completed: {} attempted, {} recorded",
        attempted, recorded
    );
    Ok(PassSummary::Completed {
        attempted,
        recorded,
    })
}
