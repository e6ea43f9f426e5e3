//! Storage behind the collector. The collector only relies on `insert`.
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::MEMORY_SINK_CAPACITY;
use crate::error::SinkError;
use crate::sample::Sample;

/// Durable home for decoded samples.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Store one sample, returning the identity assigned to it.
    async fn insert(&self, sample: &Sample) -> Result<u64, SinkError>;
}

#[async_trait]
impl<S: Sink + ?Sized> Sink for Arc<S> {
    async fn insert(&self, sample: &Sample) -> Result<u64, SinkError> {
        (**self).insert(sample).await
    }
}

struct Ring {
    samples: VecDeque<Sample>,
    capacity: usize,
    inserted: u64,
}

/// Keeps the most recent samples in memory, evicting the oldest once full.
/// Clones share the same storage.
#[derive(Clone)]
pub struct MemorySink {
    ring: Arc<Mutex<Ring>>,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::with_capacity(MEMORY_SINK_CAPACITY)
    }
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A capacity of 0 is treated as 1.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ring: Arc::new(Mutex::new(Ring {
                samples: VecDeque::with_capacity(capacity.min(MEMORY_SINK_CAPACITY)),
                capacity,
                inserted: 0,
            })),
        }
    }

    /// Retained samples, oldest first.
    pub fn samples(&self) -> Vec<Sample> {
        self.ring.lock().samples.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.ring.lock().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.lock().samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.ring.lock().capacity
    }
}

#[async_trait]
impl Sink for MemorySink {
    /// Ids keep counting across evictions.
    async fn insert(&self, sample: &Sample) -> Result<u64, SinkError> {
        let mut ring = self.ring.lock();
        if ring.samples.len() == ring.capacity {
            ring.samples.pop_front();
        }
        ring.samples.push_back(sample.clone());
        ring.inserted += 1;
        Ok(ring.inserted)
    }
}

/// A sample as persisted, with the identity and time assigned on ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSample {
    pub id: u64,
    /// Unix seconds at insert time
    pub received_at: u64,
    #[serde(flatten)]
    pub sample: Sample,
}

struct JsonLinesState {
    file: File,
    next_id: u64,
}

/// Append-only file with one [`StoredSample`] JSON object per line.
pub struct JsonLinesSink {
    path: PathBuf,
    state: Arc<Mutex<JsonLinesState>>,
}

impl JsonLinesSink {
    /// Open or create the store. Ids continue after the lines already present.
    /// A torn last line left by a crash is terminated so the next record
    /// starts on its own line.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)?;

        let mut existing = 0u64;
        for line in BufReader::new(File::open(&path)?).lines() {
            if !line?.trim().is_empty() {
                existing += 1;
            }
        }

        let len = file.metadata()?.len();
        if len > 0 {
            let mut last = [0u8; 1];
            file.read_exact_at(&mut last, len - 1)?;
            if last[0] != b'\n' {
                warn!(store = %path.display(), "Store ends with a partial line, terminating it");
                file.write_all(b"\n")?;
            }
        }

        Ok(Self {
            path,
            state: Arc::new(Mutex::new(JsonLinesState {
                file,
                next_id: existing + 1,
            })),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every readable record, oldest first. Lines that do not parse are
    /// logged and skipped.
    pub fn read_all(&self) -> Result<Vec<StoredSample>, SinkError> {
        let mut records = Vec::new();
        for (index, line) in BufReader::new(File::open(&self.path)?).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(store = %self.path.display(), line = index + 1, error = %e, "Skipping unreadable record")
                }
            }
        }
        Ok(records)
    }
}

/// Write one whole line or nothing: on failure the file is cut back to its
/// previous length.
fn append_line(file: &mut File, line: &[u8]) -> io::Result<()> {
    let previous_len = file.metadata()?.len();
    let written = file.write_all(line).and_then(|()| file.flush());
    if let Err(e) = written {
        if let Err(truncate) = file.set_len(previous_len) {
            warn!(error = %truncate, "Cannot drop partial record");
        }
        return Err(e);
    }
    Ok(())
}

#[async_trait]
impl Sink for JsonLinesSink {
    async fn insert(&self, sample: &Sample) -> Result<u64, SinkError> {
        let received_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let state = Arc::clone(&self.state);
        let sample = sample.clone();

        tokio::task::spawn_blocking(move || -> Result<u64, SinkError> {
            let mut state = state.lock();
            let record = StoredSample {
                id: state.next_id,
                received_at,
                sample,
            };
            let mut line = serde_json::to_vec(&record)?;
            line.push(b'\n');
            append_line(&mut state.file, &line)?;
            state.next_id += 1;
            Ok(record.id)
        })
        .await
        .map_err(|e| SinkError::Unavailable(format!("store writer stopped: {e}")))?
    }
}
