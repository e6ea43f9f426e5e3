//! Builds one [`Sample`] per tick from the /proc readers.
use async_trait::async_trait;
use tracing::warn;

use crate::address::local_address;
use crate::config::SamplerSettings;
use crate::constants::{DISKSTATS_FILE, MEMINFO_FILE, PROC_SMALL_CAPACITY, PROC_STAT_CAPACITY, PROC_STAT_FILE};
use crate::cpu::sample_cpu;
use crate::disk::sample_disk;
use crate::error::SampleError;
use crate::memory::sample_memory;
use crate::procfs::ProcFile;
use crate::process::sample_top_processes;
use crate::sample::Sample;

/// Source of samples for the agent loop.
#[async_trait]
pub trait Sampler: Send + Sync {
    /// Produce a fresh sample. May take as long as the measurement window.
    async fn sample(&self) -> Result<Sample, SampleError>;
}

/// Samples the local host through its proc filesystem.
pub struct SystemSampler {
    settings: SamplerSettings,
    stat: ProcFile,
    meminfo: ProcFile,
    diskstats: Option<ProcFile>,
}

impl SystemSampler {
    /// Open the /proc files once. /proc/stat and /proc/meminfo are required;
    /// disk metrics degrade to 0 when diskstats is missing.
    pub fn new(settings: SamplerSettings) -> Result<Self, SampleError> {
        let root = &settings.proc_root;
        let open = |name: &str, capacity| {
            let path = root.join(name);
            ProcFile::open(&path, capacity).map_err(|e| SampleError::io(path, e))
        };

        let stat = open(PROC_STAT_FILE, PROC_STAT_CAPACITY)?;
        let meminfo = open(MEMINFO_FILE, PROC_SMALL_CAPACITY)?;
        let diskstats = match open(DISKSTATS_FILE, PROC_SMALL_CAPACITY) {
            Ok(file) => Some(file),
            Err(e) => {
                warn!(error = %e, "disk utilization will be reported as 0");
                None
            }
        };

        Ok(Self {
            settings,
            stat,
            meminfo,
            diskstats,
        })
    }

    pub fn settings(&self) -> &SamplerSettings {
        &self.settings
    }

    pub fn sample_memory(&self) -> Result<f64, SampleError> {
        sample_memory(&self.meminfo)
    }

    /// Blocks for one measurement window.
    pub async fn sample_cpu(&self) -> Result<f64, SampleError> {
        sample_cpu(&self.stat, self.settings.window).await
    }

    /// Blocks for one measurement window. Never fails.
    pub async fn sample_disk(&self) -> f64 {
        sample_disk(
            self.diskstats.as_ref(),
            self.settings.window,
            self.settings.disk_threshold_kbps,
        )
        .await
    }

    /// Blocks for one measurement window. Never fails.
    pub async fn sample_top_processes(&self) -> String {
        sample_top_processes(
            &self.settings.proc_root,
            self.settings.top_processes,
            self.settings.window,
        )
        .await
    }

    /// Memory first, then the three windowed measurements side by side so a
    /// tick costs one window rather than three.
    pub async fn build_sample(&self) -> Result<Sample, SampleError> {
        let memory = self.sample_memory()?;
        let (cpu, disk, processes) = tokio::join!(
            self.sample_cpu(),
            self.sample_disk(),
            self.sample_top_processes()
        );

        Ok(Sample::new(
            local_address(),
            self.settings.destination_label.clone(),
            memory,
            cpu?,
            disk,
            processes,
        ))
    }
}

#[async_trait]
impl Sampler for SystemSampler {
    async fn sample(&self) -> Result<Sample, SampleError> {
        self.build_sample().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::time::{Duration, Instant};

    fn fake_proc(root: &Path) {
        fs::write(root.join("stat"), "cpu  100 0 100 800 0 0 0 0 0 0\ncpu0 100 0 100 800 0 0 0 0 0 0\n").unwrap();
        fs::write(
            root.join("meminfo"),
            "MemTotal:       1000 kB\nMemFree:         100 kB\nMemAvailable:    575 kB\n",
        )
        .unwrap();
        fs::write(root.join("diskstats"), "   8       0 sda 1 0 10 0 1 0 10 0 0 0 0\n").unwrap();
        for (pid, comm) in [(123, "chrome"), (456, "code")] {
            let dir = root.join(pid.to_string());
            fs::create_dir(&dir).unwrap();
            fs::write(
                dir.join("stat"),
                format!("{pid} ({comm}) S 1 1 1 0 -1 0 0 0 0 0 5 5 0 0 20 0 1 0 1 0 0"),
            )
            .unwrap();
        }
    }

    fn settings(root: &Path) -> SamplerSettings {
        SamplerSettings {
            proc_root: root.to_path_buf(),
            destination_label: "collector".into(),
            window: Duration::from_millis(200),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_build_sample_from_fake_proc() {
        let root = tempfile::tempdir().unwrap();
        fake_proc(root.path());
        let sampler = SystemSampler::new(settings(root.path())).unwrap();

        let started = Instant::now();
        let sample = sampler.sample().await.unwrap();
        // windows overlap, so the tick costs about one window, not three
        assert!(started.elapsed() < Duration::from_millis(550));

        assert_eq!(sample.memory_utilization_pct(), 42.5);
        assert_eq!(sample.cpu_utilization_pct(), 0.0);
        assert_eq!(sample.disk_utilization_pct(), 0.0);
        assert_eq!(sample.destination_address(), "collector");
        let mut entries: Vec<&str> = sample.process_summary().split(", ").collect();
        entries.sort();
        assert_eq!(entries, vec!["chrome:123", "code:456"]);
    }

    #[tokio::test]
    async fn test_missing_diskstats_degrades() {
        let root = tempfile::tempdir().unwrap();
        fake_proc(root.path());
        fs::remove_file(root.path().join("diskstats")).unwrap();

        let sampler = SystemSampler::new(settings(root.path())).unwrap();
        assert_eq!(sampler.sample_disk().await, 0.0);
    }

    #[test]
    fn test_missing_meminfo_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        fake_proc(root.path());
        fs::remove_file(root.path().join("meminfo")).unwrap();
        assert!(matches!(
            SystemSampler::new(settings(root.path())),
            Err(SampleError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn test_corrupt_meminfo_fails_the_tick() {
        let root = tempfile::tempdir().unwrap();
        fake_proc(root.path());
        let sampler = SystemSampler::new(settings(root.path())).unwrap();
        fs::write(root.path().join("meminfo"), "garbage\n").unwrap();
        assert!(sampler.sample().await.is_err());
    }
}
