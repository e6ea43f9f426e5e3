//! Top-N process summary built from /proc/<pid>/stat.
//!
//! Enumeration is lazy and restartable: every call to [`processes`] starts a
//! fresh walk of the proc root, and each entry is read independently, so a
//! process that exits or denies access mid-walk only loses its own entry.

use std::collections::HashMap;
use std::fs::{self, ReadDir};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::procfs::{clock_ticks_per_second, fields, parse_u64};

/// One process as read from /proc/<pid>/stat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessStat {
    pub pid: u32,
    /// Command name (`comm`), as the kernel reports it
    pub name: String,
    /// utime + stime in clock ticks
    pub cpu_ticks: u64,
}

/// A process with its CPU share over a measurement window
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessUsage {
    pub pid: u32,
    pub name: String,
    /// Percent of one CPU; None when the process was not seen at window start
    pub cpu_percent: Option<f64>,
}

/// Lazy walk over the numeric entries of a proc root.
pub struct ProcessIter {
    root: PathBuf,
    entries: ReadDir,
}

/// Start a new walk over the processes under `root`.
pub fn processes(root: &Path) -> io::Result<ProcessIter> {
    Ok(ProcessIter {
        root: root.to_path_buf(),
        entries: fs::read_dir(root)?,
    })
}

impl Iterator for ProcessIter {
    type Item = io::Result<ProcessStat>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e)),
            };
            let file_name = entry.file_name();
            let Some(pid) = file_name.to_str().and_then(|s| s.parse::<u32>().ok()) else {
                continue;
            };
            return Some(read_process(&self.root, pid));
        }
    }
}

fn read_process(root: &Path, pid: u32) -> io::Result<ProcessStat> {
    let data = fs::read(root.join(pid.to_string()).join("stat"))?;
    parse_process_stat(pid, &data)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "malformed stat line"))
}

/// Parse `pid (comm) state ppid ... utime stime ...`.
///
/// `comm` may itself contain spaces and parentheses, so it spans from the
/// first '(' to the last ')'.
pub fn parse_process_stat(pid: u32, data: &[u8]) -> Option<ProcessStat> {
    let open = data.iter().position(|&b| b == b'(')?;
    let close = data.iter().rposition(|&b| b == b')')?;
    if close <= open {
        return None;
    }
    let name = String::from_utf8_lossy(&data[open + 1..close]).into_owned();

    // fields after comm start at `state` (field 3); utime/stime are fields 14/15
    let mut rest = fields(&data[close + 1..]);
    let utime = rest.nth(11)?;
    let stime = rest.next()?;
    if !utime.iter().all(u8::is_ascii_digit) || !stime.iter().all(u8::is_ascii_digit) {
        return None;
    }

    Some(ProcessStat {
        pid,
        name,
        cpu_ticks: parse_u64(utime).saturating_add(parse_u64(stime)),
    })
}

/// Read every process once, skipping entries that cannot be read.
pub fn snapshot(root: &Path) -> io::Result<Vec<ProcessStat>> {
    Ok(processes(root)?
        .filter_map(|read| match read {
            Ok(stat) => Some(stat),
            Err(e) => {
                trace!(error = %e, "skipping process");
                None
            }
        })
        .collect())
}

/// CPU share of each process in `after` relative to its ticks in `before`.
pub fn cpu_usage(before: &[ProcessStat], after: Vec<ProcessStat>, elapsed: Duration, clk_tck: u64) -> Vec<ProcessUsage> {
    let start: HashMap<u32, u64> = before.iter().map(|p| (p.pid, p.cpu_ticks)).collect();
    let secs = elapsed.as_secs_f64().max(1e-3);
    let clk_tck = clk_tck.max(1) as f64;

    after
        .into_iter()
        .map(|p| {
            let cpu_percent = start
                .get(&p.pid)
                .map(|&ticks| p.cpu_ticks.saturating_sub(ticks) as f64 / clk_tck / secs * 100.0);
            ProcessUsage {
                pid: p.pid,
                name: p.name,
                cpu_percent,
            }
        })
        .collect()
}

/// Sort by CPU share descending (missing share counts as 0) and keep `n`.
pub fn top_processes(mut usages: Vec<ProcessUsage>, n: usize) -> Vec<ProcessUsage> {
    usages.sort_by(|a, b| {
        let a = a.cpu_percent.unwrap_or(0.0);
        let b = b.cpu_percent.unwrap_or(0.0);
        b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
    });
    usages.truncate(n);
    usages
}

/// `name:pid` entries joined by `, `
pub fn format_summary(usages: &[ProcessUsage]) -> String {
    usages
        .iter()
        .map(|p| format!("{}:{}", p.name, p.pid))
        .collect::<Vec<_>>()
        .join(", ")
}

/// [`snapshot`] on the blocking pool, so walking a large proc root does not
/// stall the runtime. Failures are logged and reported as `None`.
pub async fn snapshot_blocking(root: &Path) -> Option<Vec<ProcessStat>> {
    let owned = root.to_path_buf();
    match tokio::task::spawn_blocking(move || snapshot(&owned)).await {
        Ok(Ok(stats)) => Some(stats),
        Ok(Err(e)) => {
            debug!(root = %root.display(), error = %e, "process enumeration failed");
            None
        }
        Err(e) => {
            debug!(root = %root.display(), error = %e, "process enumeration task failed");
            None
        }
    }
}

/// Top `n` CPU consumers over `window`, formatted for the wire.
/// Empty when the proc root cannot be listed.
pub async fn sample_top_processes(root: &Path, n: usize, window: Duration) -> String {
    let Some(before) = snapshot_blocking(root).await else {
        return String::new();
    };
    let started = Instant::now();
    tokio::time::sleep(window).await;
    let Some(after) = snapshot_blocking(root).await else {
        return String::new();
    };

    let usages = cpu_usage(&before, after, started.elapsed(), clock_ticks_per_second());
    format_summary(&top_processes(usages, n))
}
