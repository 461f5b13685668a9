//! Art-Net RDM client
//!
//! Runs RDM management traffic over Art-Net: OpTodRequest/OpTodData
//! for the table of discovered devices, OpRdm for request/response
//! transactions, and the [`RdmTransport`] seam so the binary-split
//! discovery algorithm can drive an Art-Net universe directly.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::Instant;

use luxflow_core::Uid;
use luxflow_proto::artnet::{
    build_art_rdm, build_art_tod_control, build_art_tod_request, parse_art_rdm,
    parse_art_tod_data,
};
use luxflow_proto::rdm::{consts, RdmFrame};

use crate::discovery::RdmTransport;
use crate::error::{NetError, RdmnetError};
use crate::Result;

/// Configuration for an [`ArtNetRdmClient`]
#[derive(Debug, Clone)]
pub struct ArtNetRdmClientConfig {
    /// Destination host (default: limited broadcast)
    pub host: String,
    /// Destination port (default 6454)
    pub port: u16,
    /// Local bind address; RDM replies arrive here (default `0.0.0.0:6454`)
    pub bind_address: Option<String>,
    /// Universe probed by the transport seam
    pub universe: u16,
    /// The controller UID stamped on generated requests
    pub source_uid: Uid,
    /// Window to collect responses in
    pub timeout: Duration,
}

impl Default for ArtNetRdmClientConfig {
    fn default() -> Self {
        Self {
            host: "255.255.255.255".to_string(),
            port: 6454,
            bind_address: None,
            universe: 1,
            source_uid: Uid::new(0x7FF0, 1),
            timeout: Duration::from_millis(5000),
        }
    }
}

/// RDM-over-Art-Net client
pub struct ArtNetRdmClient {
    socket: UdpSocket,
    destination: SocketAddr,
    universe: u16,
    source_uid: Uid,
    timeout: Duration,
    transaction: u8,
}

impl ArtNetRdmClient {
    /// Create a client from configuration
    pub async fn new(config: ArtNetRdmClientConfig) -> Result<Self> {
        let bind = config.bind_address.as_deref().unwrap_or("0.0.0.0:6454");
        let socket = UdpSocket::bind(bind).await?;
        socket.set_broadcast(true)?;

        let destination = lookup_host((config.host.as_str(), config.port))
            .await?
            .next()
            .ok_or_else(|| {
                NetError::InvalidConfig(format!("cannot resolve Art-Net target {}", config.host))
            })?;

        tracing::info!("Art-Net RDM client created -> {}", destination);

        Ok(Self {
            socket,
            destination,
            universe: config.universe,
            source_uid: config.source_uid,
            timeout: config.timeout,
            transaction: 0,
        })
    }

    /// Request the table of devices for a universe
    ///
    /// Broadcasts OpTodRequest and concatenates the UID tables of every
    /// OpTodData reply that arrives within the timeout window.
    pub async fn get_tod(&self, universe: u16) -> Result<Vec<Uid>> {
        let request = build_art_tod_request(universe)?;
        self.socket.send_to(&request, self.destination).await?;

        let deadline = Instant::now() + self.timeout;
        let mut uids = Vec::new();
        let mut buf = [0u8; 2048];

        while let Ok(Ok((len, _))) =
            tokio::time::timeout_at(deadline, self.socket.recv_from(&mut buf)).await
        {
            if let Ok(Some(tod)) = parse_art_tod_data(&buf[..len]) {
                if tod.universe == universe {
                    uids.extend(tod.uids);
                }
            }
        }

        tracing::debug!("TOD for universe {}: {} device(s)", universe, uids.len());
        Ok(uids)
    }

    /// Force nodes to flush and rebuild their table of devices
    pub async fn flush_tod(&self, universe: u16) -> Result<()> {
        let packet = build_art_tod_control(universe, true)?;
        self.socket.send_to(&packet, self.destination).await?;
        Ok(())
    }

    /// Run one RDM transaction over OpRdm
    ///
    /// Waits for at most one decodable RDM response; undecodable
    /// traffic inside the window is ignored.
    pub async fn rdm_transaction(&self, universe: u16, request: &RdmFrame) -> Result<RdmFrame> {
        let packet = build_art_rdm(universe, &request.encode_sans_start_code()?)?;
        self.socket.send_to(&packet, self.destination).await?;

        let deadline = Instant::now() + self.timeout;
        let mut buf = [0u8; 2048];

        while let Ok(Ok((len, _))) =
            tokio::time::timeout_at(deadline, self.socket.recv_from(&mut buf)).await
        {
            let Ok(Some(reply)) = parse_art_rdm(&buf[..len]) else {
                continue;
            };
            if let Ok(frame) = RdmFrame::decode_sans_start_code(&reply.rdm_data) {
                if frame.is_response() {
                    return Ok(frame);
                }
            }
        }

        Err(NetError::Rdmnet(RdmnetError::timeout()))
    }

    fn next_transaction(&mut self) -> u8 {
        self.transaction = self.transaction.wrapping_add(1);
        self.transaction
    }
}

#[async_trait]
impl RdmTransport for ArtNetRdmClient {
    fn source_uid(&self) -> Uid {
        self.source_uid
    }

    async fn send_discovery_unique_branch(
        &mut self,
        low: Uid,
        high: Uid,
        transaction: u8,
    ) -> Result<Vec<Vec<u8>>> {
        let mut parameter_data = Vec::with_capacity(12);
        parameter_data.extend_from_slice(&low.to_bytes());
        parameter_data.extend_from_slice(&high.to_bytes());
        let request = RdmFrame {
            destination: Uid::MAX, // all-devices broadcast
            source: self.source_uid,
            transaction,
            port_id: 1,
            message_count: 0,
            sub_device: 0,
            command_class: consts::DISCOVERY_COMMAND,
            pid: consts::PID_DISC_UNIQUE_BRANCH,
            parameter_data,
        };
        let packet = build_art_rdm(self.universe, &request.encode_sans_start_code()?)?;
        self.socket.send_to(&packet, self.destination).await?;

        // Collect every OpRdm payload in the window; the discovery
        // algorithm decides what decodes.
        let deadline = Instant::now() + self.timeout;
        let mut responses = Vec::new();
        let mut buf = [0u8; 2048];
        while let Ok(Ok((len, _))) =
            tokio::time::timeout_at(deadline, self.socket.recv_from(&mut buf)).await
        {
            if let Ok(Some(reply)) = parse_art_rdm(&buf[..len]) {
                responses.push(reply.rdm_data);
            }
        }
        Ok(responses)
    }

    async fn send_request(&mut self, request: &RdmFrame) -> Result<Option<RdmFrame>> {
        match self.rdm_transaction(self.universe, request).await {
            Ok(frame) => Ok(Some(frame)),
            Err(NetError::Rdmnet(error)) if error.code == crate::ErrorCode::ResponseTimeout => {
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    async fn send_mute(&mut self, uid: Uid, _transaction: u8) -> Result<()> {
        let transaction = self.next_transaction();
        let request = RdmFrame::request(
            uid,
            self.source_uid,
            transaction,
            consts::DISCOVERY_COMMAND,
            consts::PID_DISC_MUTE,
            vec![],
        );
        self.send_request(&request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luxflow_proto::artnet::{build_art_tod_data, parse_opcode};

    async fn loopback_client(timeout: Duration) -> (ArtNetRdmClient, UdpSocket) {
        let node = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let node_addr = node.local_addr().unwrap();
        let client = ArtNetRdmClient::new(ArtNetRdmClientConfig {
            host: "127.0.0.1".to_string(),
            port: node_addr.port(),
            bind_address: Some("127.0.0.1:0".to_string()),
            universe: 1,
            timeout,
            ..Default::default()
        })
        .await
        .unwrap();
        (client, node)
    }

    #[tokio::test]
    async fn test_get_tod_collects_replies() {
        let (client, node) = loopback_client(Duration::from_millis(200)).await;
        let client_addr = client.socket.local_addr().unwrap();

        let uids = vec![Uid::new(0x4c55, 1), Uid::new(0x4c55, 2)];
        let reply = build_art_tod_data(1, &uids).unwrap();

        let node_task = tokio::spawn(async move {
            let mut buf = [0u8; 256];
            let (len, _) = node.recv_from(&mut buf).await.unwrap();
            assert_eq!(parse_opcode(&buf[..len]), Some(0x8000));
            node.send_to(&reply, client_addr).await.unwrap();
        });

        let tod = client.get_tod(1).await.unwrap();
        node_task.await.unwrap();
        assert_eq!(tod, uids);
    }

    #[tokio::test]
    async fn test_rdm_transaction_round_trip() {
        let (client, node) = loopback_client(Duration::from_millis(500)).await;
        let client_addr = client.socket.local_addr().unwrap();

        let request = RdmFrame::request(
            Uid::new(0x4c55, 9),
            Uid::new(0x7FF0, 1),
            1,
            consts::GET_COMMAND,
            consts::PID_DEVICE_INFO,
            vec![],
        );

        let node_task = tokio::spawn(async move {
            let mut buf = [0u8; 512];
            let (len, _) = node.recv_from(&mut buf).await.unwrap();
            let inbound = parse_art_rdm(&buf[..len]).unwrap().unwrap();
            let mut frame = RdmFrame::decode_sans_start_code(&inbound.rdm_data).unwrap();

            std::mem::swap(&mut frame.destination, &mut frame.source);
            frame.command_class = consts::GET_COMMAND_RESPONSE;
            frame.port_id = consts::RESPONSE_TYPE_ACK;
            frame.parameter_data = vec![1, 2, 3, 4];
            let reply = build_art_rdm(1, &frame.encode_sans_start_code().unwrap()).unwrap();
            node.send_to(&reply, client_addr).await.unwrap();
        });

        let response = client.rdm_transaction(1, &request).await.unwrap();
        node_task.await.unwrap();
        assert_eq!(response.command_class, consts::GET_COMMAND_RESPONSE);
        assert_eq!(response.parameter_data, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_rdm_transaction_times_out() {
        let (client, _node) = loopback_client(Duration::from_millis(50)).await;
        let request = RdmFrame::request(
            Uid::new(1, 1),
            Uid::new(0x7FF0, 1),
            1,
            consts::GET_COMMAND,
            consts::PID_DEVICE_INFO,
            vec![],
        );
        let result = client.rdm_transaction(1, &request).await;
        assert!(result.is_err());
    }
}
