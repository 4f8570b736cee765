//! BLE Scanner Module
//!
//! Time-bounded discovery of the peripheral by its advertised name.

use crate::infrastructure::bluetooth::backend::{BleBackend, BleError, Discovered, ScanStream};
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// How a scan ended.
#[derive(Debug)]
pub enum ScanOutcome<P> {
    Matched(Discovered<P>),
    TimedOut,
    Failed(BleError),
}

/// Scans for a single peripheral by exact advertised name.
#[derive(Debug, Clone)]
pub struct BleScanner {
    device_name: String,
    budget: Duration,
}

impl BleScanner {
    pub fn new(device_name: impl Into<String>, budget: Duration) -> Self {
        Self {
            device_name: device_name.into(),
            budget,
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Run one scan until the first matching advertisement, an error, or the
    /// budget elapses, whichever comes first. The scan is always stopped
    /// before returning.
    ///
    /// Match and timeout race inside one `select!`, so exactly one of them
    /// decides the outcome.
    pub async fn find<B: BleBackend>(&self, backend: &B) -> ScanOutcome<B::Peripheral> {
        let mut stream = match backend.start_scan().await {
            Ok(stream) => stream,
            Err(e) => return ScanOutcome::Failed(e),
        };

        info!(
            device_name = %self.device_name,
            budget_ms = self.budget.as_millis() as u64,
            "Scanning..."
        );

        let outcome = tokio::select! {
            outcome = self.first_match(&mut stream) => outcome,
            _ = tokio::time::sleep(self.budget) => {
                info!("Scan completed, {} not found!", self.device_name);
                ScanOutcome::TimedOut
            }
        };
        drop(stream);

        if let Err(e) = backend.stop_scan().await {
            warn!("Failed to stop scan cleanly: {}", e);
        }

        outcome
    }

    async fn first_match<P: Send + 'static>(&self, stream: &mut ScanStream<P>) -> ScanOutcome<P> {
        while let Some(item) = stream.next().await {
            match item {
                Ok(found) if found.name.as_deref() == Some(self.device_name.as_str()) => {
                    info!(device_name = %self.device_name, "Found matching peripheral");
                    return ScanOutcome::Matched(found);
                }
                Ok(found) => {
                    trace!(name = ?found.name, "Ignoring peripheral");
                }
                Err(e) => return ScanOutcome::Failed(e),
            }
        }

        // The stack stopped reporting; let the budget decide.
        debug!("Scan stream ended before a match");
        futures::future::pending().await
    }
}
