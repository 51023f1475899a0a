use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio_stream::StreamExt;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::Request;

use super::{
    AgentError, CaptureAgent, CaptureData, ChunkStream, ControlRequest, ControlResponse,
};

const SEND_CONTROL_COMMAND: &str = "/router_agent.CaptureAgent/SendControlCommand";
const STREAM_PACKETS: &str = "/router_agent.CaptureAgent/StreamPackets";

/// gRPC client of the capture agent.
#[derive(Clone, Debug)]
pub struct GrpcAgent {
    grpc: Grpc<Channel>,
    address: String,
    timeout: Duration,
}

impl GrpcAgent {
    /// The connection is made on first use. `timeout` bounds every control call.
    pub fn connect_lazy(address: &str, timeout: Duration) -> Result<Self, AgentError> {
        let endpoint = Endpoint::from_shared(format!("http://{address}"))
            .map_err(|err| AgentError::CaptureAgentUnavailable(format!("{address}: {err}")))?
            .connect_timeout(timeout);

        Ok(GrpcAgent {
            grpc: Grpc::new(endpoint.connect_lazy()),
            address: address.to_string(),
            timeout,
        })
    }

    async fn ready(&self) -> Result<Grpc<Channel>, AgentError> {
        let mut grpc = self.grpc.clone();
        grpc.ready()
            .await
            .map_err(|err| {
                AgentError::CaptureAgentUnavailable(format!("{}: {err}", self.address))
            })?;
        Ok(grpc)
    }
}

#[async_trait]
impl CaptureAgent for GrpcAgent {
    async fn send_control(&self, request: ControlRequest) -> Result<ControlResponse, AgentError> {
        debug!(
            "Sending {:?} to capture agent {}",
            request.command_type(),
            self.address
        );

        let call = async {
            let mut grpc = self.ready().await?;
            let codec: ProstCodec<ControlRequest, ControlResponse> = ProstCodec::default();
            let response = grpc
                .unary(
                    Request::new(request),
                    PathAndQuery::from_static(SEND_CONTROL_COMMAND),
                    codec,
                )
                .await?;
            Ok::<_, AgentError>(response.into_inner())
        };

        let response = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                AgentError::CaptureAgentUnavailable(format!(
                    "{} didn't answer within {:?}",
                    self.address, self.timeout
                ))
            })??;

        if response.success {
            Ok(response)
        } else {
            Err(AgentError::Rejected(response.message))
        }
    }

    async fn stream_packets(&self, request: ControlRequest) -> Result<ChunkStream, AgentError> {
        let mut grpc = self.ready().await?;
        let codec: ProstCodec<ControlRequest, CaptureData> = ProstCodec::default();
        let response = grpc
            .server_streaming(
                Request::new(request),
                PathAndQuery::from_static(STREAM_PACKETS),
                codec,
            )
            .await?;

        let chunks = response
            .into_inner()
            .map(|item| item.map(|data| data.frame).map_err(AgentError::from));
        Ok(Box::pin(chunks))
    }
}
