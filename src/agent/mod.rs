//! Capture agent interface
//!
//! The agent runs next to the monitor-mode radio. It takes control commands and streams the
//! capture back as a pcap file cut into chunks.

pub mod client;

pub use client::GrpcAgent;

use std::pin::Pin;

use async_trait::async_trait;
use strum_macros::Display;
use thiserror::Error;
use tokio_stream::Stream;
use tonic::{Code, Status};

#[derive(Debug, Error)]
pub enum AgentError {
    /// The agent couldn't be reached or didn't answer in time.
    #[error("Capture agent unavailable: {0}")]
    CaptureAgentUnavailable(String),
    /// The agent answered but refused the command.
    #[error("Capture agent rejected the command: {0}")]
    Rejected(String),
}

impl From<Status> for AgentError {
    fn from(status: Status) -> Self {
        match status.code() {
            Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled | Code::Unknown => {
                AgentError::CaptureAgentUnavailable(status.message().to_string())
            }
            _ => AgentError::Rejected(format!("{}: {}", status.code(), status.message())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, prost::Enumeration)]
#[repr(i32)]
pub enum ControlCommandType {
    #[strum(serialize = "START_CAPTURE")]
    StartCapture = 0,
    #[strum(serialize = "STOP_CAPTURE")]
    StopCapture = 1,
    #[strum(serialize = "SET_CHANNEL")]
    SetChannel = 2,
    #[strum(serialize = "SET_BANDWIDTH")]
    SetBandwidth = 3,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ControlRequest {
    #[prost(enumeration = "ControlCommandType", tag = "1")]
    pub command_type: i32,
    #[prost(string, tag = "2")]
    pub interface_name: String,
    #[prost(int32, tag = "3")]
    pub channel: i32,
    #[prost(string, tag = "4")]
    pub bandwidth: String,
    #[prost(string, tag = "5")]
    pub bpf_filter: String,
}

impl ControlRequest {
    pub fn new(command: ControlCommandType, settings: &CaptureSettings) -> Self {
        ControlRequest {
            command_type: command as i32,
            interface_name: settings.interface.clone(),
            channel: i32::from(settings.channel),
            bandwidth: settings.bandwidth.clone(),
            bpf_filter: settings.bpf_filter.clone(),
        }
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ControlResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(string, tag = "2")]
    pub message: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CaptureData {
    #[prost(bytes = "vec", tag = "1")]
    pub frame: Vec<u8>,
}

/// What the agent should capture.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub interface: String,
    /// 0 leaves the radio on its current channel.
    pub channel: u8,
    pub bandwidth: String,
    pub bpf_filter: String,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        CaptureSettings {
            interface: "wlan0".to_string(),
            channel: 0,
            bandwidth: "HT20".to_string(),
            bpf_filter: String::new(),
        }
    }
}

/// Chunks of the pcap byte stream, in order.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, AgentError>> + Send>>;

#[async_trait]
pub trait CaptureAgent: Send + Sync {
    /// Send a control command. A response with `success == false` is an error.
    async fn send_control(&self, request: ControlRequest) -> Result<ControlResponse, AgentError>;

    /// Subscribe to the capture stream.
    async fn stream_packets(&self, request: ControlRequest) -> Result<ChunkStream, AgentError>;
}
