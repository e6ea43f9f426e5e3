//! Collector loop: receive, decode, store. Nothing a peer sends can stop it.
use std::future::Future;
use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tracing::{debug, error, info, warn};

use crate::codec::decode;
use crate::config::CollectorConfig;
use crate::error::{Error, Result};
use crate::sink::Sink;

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectorStats {
    /// Datagrams read off the socket
    pub received: u64,
    /// Samples accepted by the sink
    pub stored: u64,
    /// Datagrams that failed to decode
    pub rejected: u64,
    /// Decoded samples the sink refused
    pub dropped: u64,
}

pub struct Collector<K> {
    socket: UdpSocket,
    sink: K,
    max_payload: usize,
}

impl<K: Sink> Collector<K> {
    pub async fn bind(config: &CollectorConfig, sink: K) -> Result<Self> {
        let socket = UdpSocket::bind(config.bind)
            .await
            .map_err(|source| Error::Bind {
                addr: config.bind.to_string(),
                source,
            })?;
        Ok(Self {
            socket,
            sink,
            max_payload: config.max_payload,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(|source| Error::Bind {
            addr: "collector socket".into(),
            source,
        })
    }

    /// Serve datagrams one at a time until `shutdown` resolves, then close
    /// the socket.
    pub async fn run<F>(self, shutdown: F) -> CollectorStats
    where
        F: Future<Output = ()>,
    {
        let Collector {
            socket,
            sink,
            max_payload,
        } = self;
        if let Ok(addr) = socket.local_addr() {
            info!(%addr, "Collector listening");
        }

        let mut stats = CollectorStats::default();
        let mut buf = vec![0u8; max_payload];
        tokio::pin!(shutdown);

        loop {
            let received = tokio::select! {
                _ = &mut shutdown => break,
                received = socket.recv_from(&mut buf) => received,
            };

            let (len, peer) = match received {
                Ok(received) => received,
                Err(e) => {
                    warn!(error = %e, "Receive failed");
                    continue;
                }
            };
            stats.received += 1;

            let sample = match decode(&buf[..len]) {
                Ok(sample) => sample,
                Err(e) => {
                    stats.rejected += 1;
                    warn!(%peer, bytes = len, error = %e, "Dropping undecodable datagram");
                    continue;
                }
            };

            info!(
                %peer,
                origin = %sample.source_address(),
                cpu = sample.cpu_utilization_pct(),
                mem = sample.memory_utilization_pct(),
                disk = sample.disk_utilization_pct(),
                "Sample received"
            );

            match sink.insert(&sample).await {
                Ok(id) => {
                    stats.stored += 1;
                    debug!(id, "Sample stored");
                }
                Err(e) => {
                    stats.dropped += 1;
                    error!(%peer, error = %e, "Sink rejected sample, dropping it");
                }
            }
        }

        drop(socket);
        info!(
            received = stats.received,
            stored = stats.stored,
            rejected = stats.rejected,
            dropped = stats.dropped,
            "Collector stopped, socket closed"
        );
        stats
    }
}
