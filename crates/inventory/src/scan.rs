use clonenux_core::config::{Config, RetryConfig};
use clonenux_core::{DeviceSource, DiscoveryStage, InventoryError, RawDeviceRecord, Result, ScanReport};
use crossbeam_channel::RecvTimeoutError;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::builder::InventoryBuilder;

/// Runs one discovery-and-build cycle per [`Scanner::scan`] call.
///
/// The device source is queried once per attempt. Retries happen only for
/// retryable errors and only up to `retry.attempts` in total, sleeping
/// `backoff_ms * attempt` between tries. With a timeout set, discovery runs on
/// its own worker thread and a late result is discarded.
pub struct Scanner<S> {
    source: Arc<S>,
    builder: InventoryBuilder,
    retry: RetryConfig,
    timeout: Option<Duration>,
}

impl<S: DeviceSource + 'static> Scanner<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
            builder: InventoryBuilder::default(),
            retry: RetryConfig::default(),
            timeout: None,
        }
    }

    pub fn from_config(source: S, config: &Config) -> Self {
        let timeout = match config.discovery.timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        Self {
            source: Arc::new(source),
            builder: InventoryBuilder::from_config(&config.inventory),
            retry: config.discovery.retry.clone(),
            timeout,
        }
    }

    pub fn with_builder(mut self, builder: InventoryBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn scan(&self) -> Result<ScanReport> {
        let max_attempts = self.retry.attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.discover() {
                Ok(records) => {
                    let inventory = self.builder.build(&records);
                    info!(
                        attempt,
                        raw = records.len(),
                        listed = inventory.len(),
                        overflow = inventory.overflow,
                        "scan complete"
                    );
                    return Ok(ScanReport::new(self.source.host(), attempt, inventory));
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = Duration::from_millis(self.retry.backoff_ms.saturating_mul(u64::from(attempt)));
                    warn!(attempt, max_attempts, %err, ?delay, "discovery failed, retrying");
                    thread::sleep(delay);
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn discover(&self) -> Result<Vec<RawDeviceRecord>> {
        let Some(timeout) = self.timeout else {
            return self.source.list_raw_devices();
        };

        let (tx, rx) = crossbeam_channel::bounded(1);
        let source = Arc::clone(&self.source);
        thread::Builder::new()
            .name("clonenux-discovery".to_string())
            .spawn(move || {
                if tx.send(source.list_raw_devices()).is_err() {
                    debug!("discovery finished after the timeout, result dropped");
                }
            })
            .map_err(|err| InventoryError::discovery(DiscoveryStage::Worker, format!("spawn discovery worker: {err}")))?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(InventoryError::DiscoveryTimedOut {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            Err(RecvTimeoutError::Disconnected) => Err(InventoryError::discovery(
                DiscoveryStage::Worker,
                "discovery worker exited without a result",
            )),
        }
    }
}
