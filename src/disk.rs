//! Disk I/O metrics collection
use std::time::{Duration, Instant};

use tracing::debug;

use crate::constants::DISK_SECTOR_SIZE;
use crate::procfs::{fields, parse_u64, ProcFile};
use crate::sample::percent;

/// Byte counters summed over all whole-disk devices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskCounters {
    /// Bytes read
    pub read: u64,
    /// Bytes written
    pub write: u64,
}

/// Check if device name should be skipped (partitions and pseudo-devices)
pub fn should_skip_device(name: &str) -> bool {
    // Skip pseudo-devices
    if name.starts_with("loop") || name.starts_with("ram") || name.starts_with("dm-") {
        return true;
    }

    let last_char = name.chars().last().unwrap_or(' ');

    // If doesn't end with digit, it's a base device - keep it
    if !last_char.is_ascii_digit() {
        return false;
    }

    // NVME/MMC partitions: nvme0n1p1, mmcblk0p2
    if let Some(p_pos) = name.rfind('p') {
        if p_pos < name.len() - 1 && name[p_pos + 1..].chars().all(|c| c.is_ascii_digit()) {
            return true;
        }
    }

    // SD/HD/VD/XVD partitions: sda1, hdb2, vdc123, xvda1
    matches!(name.chars().next(), Some('s') | Some('h') | Some('v') | Some('x'))
}

/// Sum read/write bytes from /proc/diskstats. Returns None when no device line parses.
pub fn parse_disks(data: &[u8]) -> Option<DiskCounters> {
    let mut totals = DiskCounters::default();
    let mut seen = false;

    for line in data.split(|&b| b == b'\n') {
        let cols: Vec<&[u8]> = fields(line).collect();
        if cols.len() < 10 {
            continue;
        }

        let name = match std::str::from_utf8(cols[2]) {
            Ok(n) => n,
            Err(_) => continue,
        };
        seen = true;
        if should_skip_device(name) {
            continue;
        }

        totals.read = totals
            .read
            .saturating_add(parse_u64(cols[5]).saturating_mul(DISK_SECTOR_SIZE));
        totals.write = totals
            .write
            .saturating_add(parse_u64(cols[9]).saturating_mul(DISK_SECTOR_SIZE));
    }

    seen.then_some(totals)
}

/// Map a throughput window to a utilization percentage.
///
/// `kbps = (read_delta + write_delta) / 1024 / elapsed`, then
/// `min(kbps / threshold_kbps * 100, 100)`, rounded to 2 decimals.
pub fn disk_utilization(read_delta: u64, write_delta: u64, elapsed: Duration, threshold_kbps: f64) -> f64 {
    let secs = elapsed.as_secs_f64().max(1e-3);
    let kbps = (read_delta as f64 + write_delta as f64) / 1024.0 / secs;
    if threshold_kbps <= 0.0 || threshold_kbps.is_nan() {
        return if kbps > 0.0 { 100.0 } else { 0.0 };
    }
    percent((kbps / threshold_kbps * 100.0).min(100.0))
}

fn read_counters(diskstats: &ProcFile) -> Option<DiskCounters> {
    match diskstats.read() {
        Ok(data) => parse_disks(&data),
        Err(e) => {
            debug!(path = %diskstats.path().display(), error = %e, "diskstats read failed");
            None
        }
    }
}

/// Disk utilization over `window`. Best effort: any failure yields 0.0.
pub async fn sample_disk(diskstats: Option<&ProcFile>, window: Duration, threshold_kbps: f64) -> f64 {
    let Some(diskstats) = diskstats else {
        return 0.0;
    };
    let Some(before) = read_counters(diskstats) else {
        return 0.0;
    };
    let started = Instant::now();
    tokio::time::sleep(window).await;
    let Some(after) = read_counters(diskstats) else {
        return 0.0;
    };

    disk_utilization(
        after.read.saturating_sub(before.read),
        after.write.saturating_sub(before.write),
        started.elapsed(),
        threshold_kbps,
    )
}
