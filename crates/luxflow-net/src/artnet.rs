//! Art-Net sender (UDP)
//!
//! Art-Net is a UDP-based protocol for transmitting DMX512 over
//! Ethernet, broadcast by default on port 6454.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use tokio::net::{lookup_host, UdpSocket};

use luxflow_proto::artnet::{
    build_art_command, build_art_diag_data, build_art_dmx, build_art_poll, build_art_sync,
    build_art_time_code, build_art_trigger, ArtDmxOptions, ArtTimeCode, TalkToMe,
};

use crate::{error::NetError, Result};

/// Configuration for an [`ArtNetSender`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtNetSenderConfig {
    /// Destination host (default: limited broadcast)
    pub host: String,
    /// Destination port (default 6454)
    pub port: u16,
    /// Local bind address (default `0.0.0.0:0`)
    pub bind_address: Option<String>,
    /// 1-based universe index stamped on outgoing DMX packets
    pub universe: u16,
    /// Enable SO_BROADCAST on the socket
    pub broadcast: bool,
    /// Auto-increment the DMX sequence counter (mod 256, skipping 0)
    pub auto_sequence: bool,
    /// Physical input port advertised in DMX packets
    pub physical: u8,
}

impl Default for ArtNetSenderConfig {
    fn default() -> Self {
        Self {
            host: "255.255.255.255".to_string(),
            port: 6454,
            bind_address: None,
            universe: 1,
            broadcast: true,
            auto_sequence: true,
            physical: 0,
        }
    }
}

/// Per-send overrides for [`ArtNetSender::send_raw`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtNetSendOptions {
    /// Use this sequence byte instead of the counter
    pub sequence: Option<u8>,
    /// Override the DMX payload length (clamped to 512)
    pub length: Option<u16>,
}

/// Asynchronous Art-Net sender bound to one universe
pub struct ArtNetSender {
    socket: UdpSocket,
    destination: SocketAddr,
    universe: u16,
    sequence: u8,
    auto_sequence: bool,
    physical: u8,
}

impl ArtNetSender {
    /// Create a sender from configuration
    pub async fn new(config: ArtNetSenderConfig) -> Result<Self> {
        let bind = config.bind_address.as_deref().unwrap_or("0.0.0.0:0");
        let socket = UdpSocket::bind(bind).await?;
        socket.set_broadcast(config.broadcast)?;

        let destination = lookup_host((config.host.as_str(), config.port))
            .await?
            .next()
            .ok_or_else(|| {
                NetError::InvalidConfig(format!("cannot resolve Art-Net target {}", config.host))
            })?;

        tracing::info!(
            "Art-Net sender created for universe {} -> {}",
            config.universe,
            destination
        );

        Ok(Self {
            socket,
            destination,
            universe: config.universe,
            sequence: 0,
            auto_sequence: config.auto_sequence,
            physical: config.physical,
        })
    }

    /// The configured universe
    pub fn universe(&self) -> u16 {
        self.universe
    }

    /// Change the universe for subsequent sends
    pub fn set_universe(&mut self, universe: u16) {
        self.universe = universe;
    }

    fn next_sequence(&mut self, options: &ArtNetSendOptions) -> u8 {
        if let Some(sequence) = options.sequence {
            return sequence;
        }
        if !self.auto_sequence {
            return 0;
        }
        self.sequence = self.sequence.wrapping_add(1);
        if self.sequence == 0 {
            self.sequence = 1;
        }
        self.sequence
    }

    /// Send a DMX frame as an OpDmx packet
    pub async fn send_raw(&mut self, data: &[u8], options: ArtNetSendOptions) -> Result<()> {
        let sequence = self.next_sequence(&options);
        let packet = build_art_dmx(&ArtDmxOptions {
            universe: self.universe,
            sequence,
            physical: self.physical,
            data,
            length: options.length,
        })?;
        self.send_packet(&packet).await?;
        tracing::trace!(
            "sent ArtDmx universe={} sequence={} length={}",
            self.universe,
            sequence,
            packet.len() - 18
        );
        Ok(())
    }

    /// Send an ArtSync pulse
    pub async fn send_sync(&self) -> Result<()> {
        self.send_packet(&build_art_sync()).await
    }

    /// Send an ArtPoll
    pub async fn send_poll(&self, flags: TalkToMe, priority: u8) -> Result<()> {
        self.send_packet(&build_art_poll(flags, priority)).await
    }

    /// Send an ArtDiagData message
    pub async fn send_diag(&self, priority: u8, text: &str) -> Result<()> {
        self.send_packet(&build_art_diag_data(priority, text)?).await
    }

    /// Send an ArtTimeCode frame
    pub async fn send_time_code(&self, time_code: &ArtTimeCode) -> Result<()> {
        self.send_packet(&build_art_time_code(time_code)).await
    }

    /// Send an ArtCommand
    pub async fn send_command(&self, esta: u16, text: &str) -> Result<()> {
        self.send_packet(&build_art_command(esta, text)?).await
    }

    /// Send an ArtTrigger
    pub async fn send_trigger(&self, oem: u16, key: u8, sub_key: u8, payload: &[u8]) -> Result<()> {
        self.send_packet(&build_art_trigger(oem, key, sub_key, payload)?)
            .await
    }

    async fn send_packet(&self, packet: &[u8]) -> Result<()> {
        self.socket.send_to(packet, self.destination).await?;
        Ok(())
    }

    /// Release the socket
    pub fn close(self) {
        // Dropping the sender closes the socket.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luxflow_proto::artnet::parse_art_dmx;

    async fn loopback_pair() -> (ArtNetSender, UdpSocket) {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = receiver.local_addr().unwrap().port();
        let sender = ArtNetSender::new(ArtNetSenderConfig {
            host: "127.0.0.1".to_string(),
            port,
            broadcast: false,
            universe: 257,
            ..Default::default()
        })
        .await
        .unwrap();
        (sender, receiver)
    }

    #[tokio::test]
    async fn test_send_raw_round_trip() {
        let (mut sender, receiver) = loopback_pair().await;
        sender
            .send_raw(&[1, 2, 3, 4], ArtNetSendOptions::default())
            .await
            .unwrap();

        let mut buf = [0u8; 1024];
        let (len, _) = receiver.recv_from(&mut buf).await.unwrap();
        let parsed = parse_art_dmx(&buf[..len]).unwrap().unwrap();
        assert_eq!(parsed.universe, 257);
        assert_eq!(parsed.sequence, 1);
        assert_eq!(parsed.data, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_sequence_skips_zero() {
        let (mut sender, _receiver) = loopback_pair().await;
        sender.sequence = 255;
        let sequence = sender.next_sequence(&ArtNetSendOptions::default());
        assert_eq!(sequence, 1);
        let sequence = sender.next_sequence(&ArtNetSendOptions::default());
        assert_eq!(sequence, 2);
    }

    #[tokio::test]
    async fn test_sequence_override() {
        let (mut sender, _receiver) = loopback_pair().await;
        let sequence = sender.next_sequence(&ArtNetSendOptions {
            sequence: Some(99),
            ..Default::default()
        });
        assert_eq!(sequence, 99);
        // The counter did not advance.
        assert_eq!(sender.sequence, 0);
    }

    #[tokio::test]
    async fn test_send_sync_opcode() {
        let (sender, receiver) = loopback_pair().await;
        sender.send_sync().await.unwrap();

        let mut buf = [0u8; 64];
        let (len, _) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(len, 14);
        assert_eq!(buf[8], 0x00);
        assert_eq!(buf[9], 0x52);
    }

    #[tokio::test]
    async fn test_invalid_target_fails() {
        let result = ArtNetSender::new(ArtNetSenderConfig {
            host: "".to_string(),
            ..Default::default()
        })
        .await;
        assert!(result.is_err());
    }
}
