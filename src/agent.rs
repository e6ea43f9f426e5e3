//! Agent loop: sample, encode, send, sleep out the rest of the interval.
use std::future::Future;
use std::time::Instant;

use tokio::net::UdpSocket;
use tracing::{debug, error, info, warn};

use crate::codec::{encode, MAX_PAYLOAD_SIZE};
use crate::config::AgentConfig;
use crate::error::{Error, Result};
use crate::sampler::Sampler;

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentStats {
    pub ticks: u64,
    pub sent: u64,
    pub failed: u64,
}

pub struct Agent<S> {
    config: AgentConfig,
    sampler: S,
}

impl<S: Sampler> Agent<S> {
    pub fn new(config: AgentConfig, sampler: S) -> Self {
        Self { config, sampler }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run until `shutdown` resolves. Delivery is best effort: a failed tick
    /// is logged and the next one starts on schedule. The socket is closed
    /// before returning.
    pub async fn run<F>(&self, shutdown: F) -> Result<AgentStats>
    where
        F: Future<Output = ()>,
    {
        let socket = UdpSocket::bind(self.config.bind)
            .await
            .map_err(|source| Error::Bind {
                addr: self.config.bind.to_string(),
                source,
            })?;
        info!(
            server = %self.config.server,
            interval_secs = self.config.interval.as_secs_f64(),
            "Agent started"
        );

        let mut stats = AgentStats::default();
        tokio::pin!(shutdown);

        loop {
            let tick_start = Instant::now();
            stats.ticks += 1;

            tokio::select! {
                _ = &mut shutdown => break,
                sent = self.tick(&socket) => {
                    if sent {
                        stats.sent += 1;
                    } else {
                        stats.failed += 1;
                    }
                }
            }

            let remaining = self.config.interval.saturating_sub(tick_start.elapsed());
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(remaining) => {}
            }
        }

        drop(socket);
        info!(
            ticks = stats.ticks,
            sent = stats.sent,
            failed = stats.failed,
            "Agent stopped, socket closed"
        );
        Ok(stats)
    }

    /// One sample-encode-send cycle. Returns whether a datagram left.
    async fn tick(&self, socket: &UdpSocket) -> bool {
        let sample = match self.sampler.sample().await {
            Ok(sample) => sample,
            Err(e) => {
                warn!(error = %e, "Sampling failed, skipping tick");
                return false;
            }
        };

        let payload = match encode(&sample) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "Encoding failed, skipping tick");
                return false;
            }
        };
        if payload.len() > MAX_PAYLOAD_SIZE {
            warn!(
                bytes = payload.len(),
                limit = MAX_PAYLOAD_SIZE,
                "Payload exceeds collector buffer and will be truncated"
            );
        }

        match socket.send_to(&payload, self.config.server.as_str()).await {
            Ok(bytes) => {
                info!(
                    cpu = sample.cpu_utilization_pct(),
                    mem = sample.memory_utilization_pct(),
                    disk = sample.disk_utilization_pct(),
                    "Sample sent"
                );
                debug!(bytes, processes = %sample.process_summary(), "datagram details");
                true
            }
            Err(e) => {
                warn!(server = %self.config.server, error = %e, "Send failed");
                false
            }
        }
    }
}
