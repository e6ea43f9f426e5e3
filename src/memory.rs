//! Memory metrics collection
use crate::error::SampleError;
use crate::procfs::{parse_number_from_line, ProcFile};
use crate::sample::percent;

/// Memory counters from /proc/meminfo
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryEntry {
    /// Total memory in KiB
    pub total_kib: u64,
    /// Available memory in KiB
    pub available_kib: u64,
    /// Used percentage (0-100.0)
    pub used_percent: f64,
}

/// Parse memory statistics from /proc/meminfo.
pub fn collect_memory(data: &[u8]) -> Option<MemoryEntry> {
    let mut total_kib = 0u64;
    let mut available_kib = 0u64;
    let mut found_both = 0u8;

    for line in data.split(|&b| b == b'\n') {
        if line.starts_with(b"MemTotal:") && found_both & 1 == 0 {
            total_kib = parse_number_from_line(line);
            found_both |= 1;
        } else if line.starts_with(b"MemAvailable:") && found_both & 2 == 0 {
            available_kib = parse_number_from_line(line);
            found_both |= 2;
        }
        if found_both == 3 {
            break;
        }
    }

    if total_kib == 0 || found_both != 3 {
        return None;
    }

    let used_kib = total_kib.saturating_sub(available_kib);
    let used_percent = (used_kib as f64 * 100.0) / total_kib as f64;

    Some(MemoryEntry {
        total_kib,
        available_kib,
        used_percent,
    })
}

/// System-wide memory used percentage, rounded to 2 decimals.
pub fn sample_memory(meminfo: &ProcFile) -> Result<f64, SampleError> {
    let data = meminfo
        .read()
        .map_err(|e| SampleError::io(meminfo.path(), e))?;
    let entry = collect_memory(&data).ok_or_else(|| SampleError::Missing {
        path: meminfo.path().to_path_buf(),
        what: "MemTotal/MemAvailable",
    })?;
    Ok(percent(entry.used_percent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_collect_memory_valid() {
        let data = b"MemTotal:       16304284 kB\nMemFree:         8123456 kB\nMemAvailable:    8967832 kB";
        let mem = collect_memory(data).unwrap();

        assert_eq!(mem.total_kib, 16304284);
        assert_eq!(mem.available_kib, 8967832);
        let used_kib = 16304284 - 8967832;
        let expected_percent = (used_kib as f64 * 100.0) / 16304284.0;
        assert!((mem.used_percent - expected_percent).abs() < 0.1);
    }

    #[test]
    fn test_collect_memory_missing_total() {
        assert!(collect_memory(b"MemAvailable:    8967832 kB").is_none());
    }

    #[test]
    fn test_collect_memory_missing_available() {
        assert!(collect_memory(b"MemTotal:       16304284 kB").is_none());
    }

    #[test]
    fn test_collect_memory_available_greater_than_total() {
        let mem = collect_memory(b"MemTotal:       10000 kB\nMemAvailable:    20000 kB").unwrap();
        // saturating_sub keeps used at 0
        assert_eq!(mem.used_percent, 0.0);
    }

    #[test]
    fn test_collect_memory_all_used() {
        let mem = collect_memory(b"MemTotal:       10000 kB\nMemAvailable:    0 kB").unwrap();
        assert_eq!(mem.used_percent, 100.0);
    }

    #[test]
    fn test_sample_memory_rounds() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"MemTotal: 3000 kB\nMemFree: 1 kB\nMemAvailable: 2000 kB\n")
            .unwrap();
        let file = ProcFile::open(tmp.path(), 64).unwrap();
        assert_eq!(sample_memory(&file).unwrap(), 33.33);
    }

    #[test]
    fn test_sample_memory_garbage_is_error() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"nothing useful here\n").unwrap();
        let file = ProcFile::open(tmp.path(), 64).unwrap();
        assert!(matches!(
            sample_memory(&file),
            Err(SampleError::Missing { .. })
        ));
    }
}
