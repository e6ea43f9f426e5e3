//! Paths, limits and defaults shared by the agent and the collector.

use std::time::Duration;

/// Root of the proc filesystem
pub const PROC_ROOT: &str = "/proc";

/// File under the proc root holding CPU tick counters
pub const PROC_STAT_FILE: &str = "stat";

/// File under the proc root holding memory counters
pub const MEMINFO_FILE: &str = "meminfo";

/// File under the proc root holding block device counters
pub const DISKSTATS_FILE: &str = "diskstats";

/// Initial read buffer for /proc/stat (~5.5KB on a 16 core box)
pub const PROC_STAT_CAPACITY: usize = 8192;

/// Initial read buffer for the smaller /proc files
pub const PROC_SMALL_CAPACITY: usize = 4096;

/// Disk sector size in bytes
pub const DISK_SECTOR_SIZE: u64 = 512;

/// Length of the CPU, disk and process measurement windows
pub const MEASUREMENT_WINDOW: Duration = Duration::from_secs(1);

/// Disk throughput in KB/s reported as 100% utilization
pub const DEFAULT_DISK_THRESHOLD_KBPS: f64 = 10_000.0;

/// Number of processes kept in the process summary
pub const DEFAULT_TOP_PROCESSES: usize = 10;

/// Fallback for sysconf(_SC_CLK_TCK)
pub const DEFAULT_CLK_TCK: u64 = 100;

/// Largest datagram the collector reads; longer ones are truncated
pub const MAX_PAYLOAD_SIZE: usize = 4096;

/// Samples retained by the in-memory sink before the oldest are evicted
pub const MEMORY_SINK_CAPACITY: usize = 1024;

/// Collector UDP port
pub const DEFAULT_PORT: u16 = 5005;

/// Default time between two agent ticks
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Address the agent "connects" to so the OS picks a routable source address
pub const ADDRESS_PROBE_TARGET: &str = "8.8.8.8:80";

/// Source address reported when no routable address is found
pub const LOOPBACK_ADDRESS: &str = "127.0.0.1";
