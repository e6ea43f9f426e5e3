//! CPU metrics collection and parsing
use std::time::Duration;

use crate::error::SampleError;
use crate::procfs::ProcFile;
use crate::sample::percent;

/// CPU counter values from the aggregate `cpu` line of /proc/stat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuCounters {
    /// Total ticks (user through steal; guest time is already inside user/nice)
    pub total: u64,
    /// Idle plus iowait ticks
    pub idle: u64,
}

/// Find the aggregate `cpu ` line in /proc/stat and parse its counters.
pub fn parse_cpu_totals(data: &[u8]) -> Option<CpuCounters> {
    data.split(|&b| b == b'\n')
        .find(|line| line.starts_with(b"cpu ") || line.starts_with(b"cpu\t"))
        .map(|line| parse_cpu_counters(&line[3..]))
        .filter(|counters| counters.total > 0)
}

/// Parse total and idle ticks from the numeric part of a CPU line
fn parse_cpu_counters(data: &[u8]) -> CpuCounters {
    let mut total: u64 = 0;
    let mut idle: u64 = 0;
    let mut field = 0;
    let mut num = 0u64;
    let mut in_num = false;

    // trailing separator so the last number is flushed
    for &b in data.iter().chain(std::iter::once(&b' ')) {
        if b.is_ascii_digit() {
            num = num.wrapping_mul(10).wrapping_add((b - b'0') as u64);
            in_num = true;
        } else if in_num {
            if field <= 7 {
                total = total.wrapping_add(num);
            }
            if field == 3 || field == 4 {
                idle = idle.wrapping_add(num);
            }
            field += 1;
            num = 0;
            in_num = false;
            if field > 7 {
                break;
            }
        }
    }

    CpuCounters { total, idle }
}

/// CPU usage percentage between two snapshots
pub fn calculate_cpu_usage(prev: CpuCounters, current: CpuCounters) -> f64 {
    let total_diff = current.total.saturating_sub(prev.total);
    if total_diff == 0 {
        return 0.0;
    }

    let idle_diff = current.idle.saturating_sub(prev.idle);
    let active = total_diff.saturating_sub(idle_diff);
    percent(active as f64 * 100.0 / total_diff as f64)
}

fn read_counters(stat: &ProcFile) -> Result<CpuCounters, SampleError> {
    let data = stat.read().map_err(|e| SampleError::io(stat.path(), e))?;
    parse_cpu_totals(&data).ok_or_else(|| SampleError::Missing {
        path: stat.path().to_path_buf(),
        what: "aggregate cpu line",
    })
}

/// CPU utilization averaged over `window`.
///
/// Waits for the whole window between the two snapshots; callers budget
/// their tick latency around it.
pub async fn sample_cpu(stat: &ProcFile, window: Duration) -> Result<f64, SampleError> {
    let before = read_counters(stat)?;
    tokio::time::sleep(window).await;
    let after = read_counters(stat)?;
    Ok(calculate_cpu_usage(before, after))
}
