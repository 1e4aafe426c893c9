use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{info, warn};
use reqwest::{Client, StatusCode};

/// Outcome of a single timed GET.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub ok: bool,
    pub elapsed_seconds: f64,
    /// `None` when no response was received.
    pub status: Option<StatusCode>,
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult;
}

pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(client: Client, timeout: Duration) -> Self {
        HttpFetcher { client, timeout }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        let started = Instant::now();
        let response = match self.client.get(url).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to connect to {}: {}", url, e);
                return FetchResult {
                    ok: false,
                    elapsed_seconds: started.elapsed().as_secs_f64(),
                    status: None,
                };
            }
        };
        let status = response.status();
        // The download of the body is part of the measured latency.
        let body = response.bytes().await;
        let elapsed_seconds = started.elapsed().as_secs_f64();

        let ok = match body {
            Ok(_) => status == StatusCode::OK,
            Err(e) => {
                warn!("Failed to read body from {}: {}", url, e);
                false
            }
        };
        if ok {
            info!("Connected to {}: {} in {:.3}s", url, status, elapsed_seconds);
        } else {
            warn!("Connected to {}: {} in {:.3}s", url, status, elapsed_seconds);
        }
        FetchResult {
            ok,
            elapsed_seconds,
            status: Some(status),
        }
    }
}
