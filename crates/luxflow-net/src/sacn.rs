//! sACN (E1.31) sender (UDP multicast)
//!
//! Sends E1.31 data packets to the universe's multicast group (or a
//! unicast override) on port 5568, with an optional refresh-rate
//! keepalive that repeats the last frame for receivers that expect a
//! steady stream.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use luxflow_proto::sacn::{
    layout, multicast_group, validate_sacn_universe, SacnPacket, SacnPacketOptions, SacnPayload,
};

use crate::Result;

/// Configuration for a [`SacnSender`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SacnSenderConfig {
    /// sACN universe (1-63999)
    pub universe: u16,
    /// Unicast destination; the universe multicast group when unset
    pub destination: Option<IpAddr>,
    /// Destination port (default 5568)
    pub port: u16,
    /// Local bind address
    pub bind_address: Option<SocketAddr>,
    /// Interface to send multicast from
    pub iface: Option<Ipv4Addr>,
    /// Source name stamped on every packet (up to 63 characters)
    pub source_name: String,
    /// Packet priority (default 100)
    pub priority: u8,
    /// Component identifier; random when unset
    pub cid: Option<[u8; 16]>,
    /// Keepalive rate in Hz; 0 disables the refresh loop
    pub refresh_rate: f64,
}

impl Default for SacnSenderConfig {
    fn default() -> Self {
        Self {
            universe: 1,
            destination: None,
            port: layout::SACN_PORT,
            bind_address: None,
            iface: None,
            source_name: "luxflow".to_string(),
            priority: layout::DEFAULT_PRIORITY,
            cid: None,
            refresh_rate: 0.0,
        }
    }
}

/// Asynchronous sACN sender bound to one universe
pub struct SacnSender {
    socket: Arc<UdpSocket>,
    destination: SocketAddr,
    universe: u16,
    sequence: u8,
    source_name: String,
    priority: u8,
    cid: [u8; 16],
    last_packet: Arc<Mutex<Option<Vec<u8>>>>,
    refresh_task: Option<JoinHandle<()>>,
    resend_status: watch::Sender<bool>,
}

impl SacnSender {
    /// Create a sender from configuration
    pub async fn new(config: SacnSenderConfig) -> Result<Self> {
        let universe = validate_sacn_universe(config.universe)?;

        let socket = Arc::new(bind_socket(&config)?);
        let _ = socket.set_multicast_loop_v4(false);

        let destination = match config.destination {
            Some(address) => SocketAddr::new(address, config.port),
            None => SocketAddr::new(IpAddr::V4(multicast_group(universe)?), config.port),
        };

        let cid = config
            .cid
            .unwrap_or_else(|| *uuid::Uuid::new_v4().as_bytes());

        tracing::info!(
            "sACN sender created for universe {} -> {}",
            universe,
            destination
        );

        let (resend_status, _) = watch::channel(true);
        let last_packet = Arc::new(Mutex::new(None));

        let mut sender = Self {
            socket,
            destination,
            universe,
            sequence: 0,
            source_name: config.source_name,
            priority: config.priority,
            cid,
            last_packet,
            refresh_task: None,
            resend_status,
        };

        if config.refresh_rate > 0.0 {
            sender.start_refresh_task(config.refresh_rate);
        }

        Ok(sender)
    }

    fn start_refresh_task(&mut self, rate: f64) {
        let socket = Arc::clone(&self.socket);
        let destination = self.destination;
        let last_packet = Arc::clone(&self.last_packet);
        let status = self.resend_status.clone();
        let period = Duration::from_millis((1000.0 / rate) as u64);

        self.refresh_task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let packet = last_packet
                    .lock()
                    .unwrap_or_else(|poison| poison.into_inner())
                    .clone();
                let Some(packet) = packet else { continue };

                let ok = socket.send_to(&packet, destination).await.is_ok();
                // Fires only on success <-> failure transitions.
                status.send_if_modified(|previous| {
                    if *previous != ok {
                        *previous = ok;
                        true
                    } else {
                        false
                    }
                });
                if !ok {
                    tracing::warn!("sACN refresh resend to {} failed", destination);
                }
            }
        }));
    }

    /// Watch the refresh loop's success/failure state
    ///
    /// The value changes only on transitions between a run of
    /// successful resends and a run of failures.
    pub fn resend_status(&self) -> watch::Receiver<bool> {
        self.resend_status.subscribe()
    }

    /// The configured universe
    pub fn universe(&self) -> u16 {
        self.universe
    }

    /// Set the packet priority (clamped to 200)
    pub fn set_priority(&mut self, priority: u8) {
        self.priority = priority.min(200);
    }

    /// Send a payload, stamping the next sequence byte
    pub async fn send(&mut self, payload: SacnPayload, use_raw_dmx_values: bool) -> Result<()> {
        self.sequence = self.sequence.wrapping_add(1);
        let packet = SacnPacket::build(&SacnPacketOptions {
            universe: self.universe,
            payload,
            sequence: self.sequence,
            source_name: self.source_name.clone(),
            priority: self.priority,
            cid: Some(self.cid),
            options: 0,
            sync_universe: 0,
            use_raw_dmx_values,
        })?
        .to_bytes();

        self.socket.send_to(&packet, self.destination).await?;
        *self
            .last_packet
            .lock()
            .unwrap_or_else(|poison| poison.into_inner()) = Some(packet);
        tracing::trace!(
            "sent sACN universe={} sequence={}",
            self.universe,
            self.sequence
        );
        Ok(())
    }

    /// Send a sparse channel map of percentages (0-100)
    pub async fn send_channels(&mut self, channels: BTreeMap<u16, f64>) -> Result<()> {
        self.send(SacnPayload::Channels(channels), false).await
    }

    /// Send a raw DMX frame
    pub async fn send_raw(&mut self, frame: &[u8]) -> Result<()> {
        self.send(SacnPayload::Raw(frame.to_vec()), true).await
    }

    /// Stop the refresh loop and release the socket
    pub fn close(&mut self) {
        if let Some(task) = self.refresh_task.take() {
            task.abort();
        }
    }
}

impl Drop for SacnSender {
    fn drop(&mut self) {
        self.close();
    }
}

fn bind_socket(config: &SacnSenderConfig) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    let bind = config
        .bind_address
        .unwrap_or_else(|| SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0));
    socket.bind(&bind.into())?;
    if let Some(iface) = config.iface {
        socket.set_multicast_if_v4(&iface)?;
    }
    socket.set_nonblocking(true)?;
    UdpSocket::from_std(socket.into())
}
