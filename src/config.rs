//! Runtime configuration handed explicitly to the sampler and the two loops.
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::*;
use crate::error::{Error, Result};

/// What the sampler measures and how.
#[derive(Clone, Debug)]
pub struct SamplerSettings {
    /// Root of the proc filesystem
    pub proc_root: PathBuf,
    /// Informational collector label carried in every sample
    pub destination_label: String,
    /// Length of the CPU, disk and process windows
    pub window: Duration,
    /// Disk throughput reported as 100%
    pub disk_threshold_kbps: f64,
    /// Entries kept in the process summary
    pub top_processes: usize,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from(PROC_ROOT),
            destination_label: format!("127.0.0.1:{DEFAULT_PORT}"),
            window: MEASUREMENT_WINDOW,
            disk_threshold_kbps: DEFAULT_DISK_THRESHOLD_KBPS,
            top_processes: DEFAULT_TOP_PROCESSES,
        }
    }
}

impl SamplerSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.disk_threshold_kbps > 0.0 && self.disk_threshold_kbps.is_finite()) {
            return Err(Error::Config(format!(
                "disk threshold must be a positive number of KB/s, got {}",
                self.disk_threshold_kbps
            )));
        }
        if self.window.is_zero() {
            return Err(Error::Config("measurement window must be non-zero".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Collector `host:port`; resolved on every send
    pub server: String,
    /// Local address the sending socket binds to
    pub bind: SocketAddr,
    /// Target time between tick starts
    pub interval: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server: format!("127.0.0.1:{DEFAULT_PORT}"),
            bind: SocketAddr::from(([0, 0, 0, 0], 0)),
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.server.trim().is_empty() {
            return Err(Error::Config("server address is empty".into()));
        }
        if self.interval.is_zero() {
            return Err(Error::Config("interval must be non-zero".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct CollectorConfig {
    /// Address the receive socket binds to
    pub bind: SocketAddr,
    /// Receive buffer; longer datagrams are truncated
    pub max_payload: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_payload: MAX_PAYLOAD_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SamplerSettings::default().validate().is_ok());
        assert!(AgentConfig::default().validate().is_ok());
        assert_eq!(CollectorConfig::default().max_payload, 4096);
    }

    #[test]
    fn test_rejects_bad_threshold() {
        for threshold in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let settings = SamplerSettings {
                disk_threshold_kbps: threshold,
                ..Default::default()
            };
            assert!(settings.validate().is_err(), "{threshold}");
        }
    }

    #[test]
    fn test_rejects_zero_interval() {
        let config = AgentConfig {
            interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
