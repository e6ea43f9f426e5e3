use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::{AgentConfig, CollectorConfig, SamplerSettings};
use crate::constants::*;

/// Host metrics agent and collector
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CmdArgs {
    /// Log at debug level
    #[arg(short, long, global = true, env = "HOSTMON_VERBOSE")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sample this host and push metrics to a collector
    Agent(AgentArgs),
    /// Receive metrics from agents and store them
    Collector(CollectorArgs),
}

#[derive(Args, Debug)]
pub struct AgentArgs {
    /// Collector address as host:port
    #[arg(long, env = "HOSTMON_SERVER", default_value_t = format!("127.0.0.1:{DEFAULT_PORT}"))]
    pub server: String,

    /// Collector label carried in every sample (defaults to --server)
    #[arg(long, env = "HOSTMON_DESTINATION_LABEL")]
    pub destination_label: Option<String>,

    /// Seconds between ticks
    #[arg(long, env = "HOSTMON_INTERVAL_SECS", default_value_t = DEFAULT_INTERVAL.as_secs())]
    pub interval_secs: u64,

    /// Disk throughput in KB/s reported as 100%
    #[arg(long, env = "HOSTMON_DISK_THRESHOLD_KBPS", default_value_t = DEFAULT_DISK_THRESHOLD_KBPS)]
    pub disk_threshold_kbps: f64,

    /// Processes listed per sample
    #[arg(long, env = "HOSTMON_TOP_PROCESSES", default_value_t = DEFAULT_TOP_PROCESSES)]
    pub top_processes: usize,

    /// Root of the proc filesystem
    #[arg(long, env = "HOSTMON_PROC_ROOT", default_value = PROC_ROOT)]
    pub proc_root: PathBuf,
}

impl AgentArgs {
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            server: self.server.clone(),
            interval: Duration::from_secs(self.interval_secs),
            ..Default::default()
        }
    }

    pub fn sampler_settings(&self) -> SamplerSettings {
        SamplerSettings {
            proc_root: self.proc_root.clone(),
            destination_label: self
                .destination_label
                .clone()
                .unwrap_or_else(|| self.server.clone()),
            window: MEASUREMENT_WINDOW,
            disk_threshold_kbps: self.disk_threshold_kbps,
            top_processes: self.top_processes,
        }
    }
}

#[derive(Args, Debug)]
pub struct CollectorArgs {
    /// Address to receive datagrams on
    #[arg(long, env = "HOSTMON_BIND", default_value_t = SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)))]
    pub bind: SocketAddr,

    /// JSON-lines file to append samples to; samples are kept in memory when unset
    #[arg(long, env = "HOSTMON_STORE")]
    pub store: Option<PathBuf>,
}

impl CollectorArgs {
    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            bind: self.bind,
            ..Default::default()
        }
    }
}
