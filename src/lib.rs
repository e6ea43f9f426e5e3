//! Host metrics telemetry: an agent that samples CPU, memory, disk and top
//! processes from /proc and pushes one UDP datagram per tick, and a collector
//! that decodes those datagrams and hands them to a [`sink::Sink`].

pub mod address;
pub mod agent;
pub mod cli;
pub mod codec;
pub mod collector;
pub mod config;
pub mod constants;
pub mod cpu;
pub mod disk;
pub mod error;
pub mod memory;
pub mod process;
pub mod procfs;
pub mod sample;
pub mod sampler;
pub mod sink;

pub use agent::{Agent, AgentStats};
pub use collector::{Collector, CollectorStats};
pub use error::{DecodeError, EncodeError, Error, Result, SampleError, SinkError};
pub use sample::Sample;
pub use sampler::{Sampler, SystemSampler};
pub use sink::{JsonLinesSink, MemorySink, Sink};
