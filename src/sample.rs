//! The single record an agent transmits per tick.

use serde::{Deserialize, Serialize};

/// One host utilization sample.
///
/// Field names on the wire are fixed by the collector protocol, see
/// [`crate::codec`]. Fields are only reachable through accessors: a sample
/// is either built by [`Sample::new`], which clamps and rounds, or decoded
/// by [`crate::codec::decode`], which rejects anything outside [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(rename = "ip_origem")]
    source_address: String,
    #[serde(rename = "ip_destino")]
    destination_address: String,
    #[serde(rename = "uso_memoria")]
    memory_utilization_pct: f64,
    #[serde(rename = "uso_cpu")]
    cpu_utilization_pct: f64,
    #[serde(rename = "uso_disco")]
    disk_utilization_pct: f64,
    #[serde(rename = "processos")]
    process_summary: String,
}

impl Sample {
    pub fn new(
        source_address: impl Into<String>,
        destination_address: impl Into<String>,
        memory_utilization_pct: f64,
        cpu_utilization_pct: f64,
        disk_utilization_pct: f64,
        process_summary: impl Into<String>,
    ) -> Self {
        Sample {
            source_address: source_address.into(),
            destination_address: destination_address.into(),
            memory_utilization_pct: percent(memory_utilization_pct),
            cpu_utilization_pct: percent(cpu_utilization_pct),
            disk_utilization_pct: percent(disk_utilization_pct),
            process_summary: process_summary.into(),
        }
    }

    /// Address the agent sent from.
    pub fn source_address(&self) -> &str {
        &self.source_address
    }

    /// Label of the collector the agent was configured for.
    pub fn destination_address(&self) -> &str {
        &self.destination_address
    }

    pub fn memory_utilization_pct(&self) -> f64 {
        self.memory_utilization_pct
    }

    pub fn cpu_utilization_pct(&self) -> f64 {
        self.cpu_utilization_pct
    }

    pub fn disk_utilization_pct(&self) -> f64 {
        self.disk_utilization_pct
    }

    /// `name:pid` entries joined by `", "`, busiest first.
    pub fn process_summary(&self) -> &str {
        &self.process_summary
    }

    /// The three percentage fields with their wire names.
    pub(crate) fn percentages(&self) -> [(&'static str, f64); 3] {
        [
            ("uso_memoria", self.memory_utilization_pct),
            ("uso_cpu", self.cpu_utilization_pct),
            ("uso_disco", self.disk_utilization_pct),
        ]
    }

    /// First percentage that is NaN, infinite or outside [0, 100].
    pub(crate) fn out_of_range(&self) -> Option<(&'static str, f64)> {
        self.percentages()
            .into_iter()
            .find(|(_, value)| !(0.0..=100.0).contains(value))
    }
}

/// Clamp to [0, 100] and round to 2 decimals. NaN maps to 0.
pub fn percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    round2(value.clamp(0.0, 100.0))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
