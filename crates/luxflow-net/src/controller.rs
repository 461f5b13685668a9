//! DMX controller
//!
//! Owns a set of universes and one sender per universe. Channel writes
//! land in the universe buffers; [`flush`](DmxController::flush) sends
//! only the universes whose dirty flag is set, optionally followed by
//! a single ArtSync pulse so fixtures latch all universes together.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use luxflow_core::Universe;

use crate::artnet::{ArtNetSendOptions, ArtNetSender, ArtNetSenderConfig};
use crate::sacn::{SacnSender, SacnSenderConfig};
use crate::Result;

/// A transport that can carry a raw DMX frame for one universe
#[async_trait]
pub trait DmxSender: Send {
    /// Send the 512-byte frame as-is
    async fn send_raw(&mut self, frame: &[u8]) -> Result<()>;

    /// Whether this sender understands [`send_sync`](Self::send_sync)
    fn supports_sync(&self) -> bool {
        false
    }

    /// Emit a synchronization pulse (Art-Net only)
    async fn send_sync(&mut self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl DmxSender for ArtNetSender {
    async fn send_raw(&mut self, frame: &[u8]) -> Result<()> {
        ArtNetSender::send_raw(self, frame, ArtNetSendOptions::default()).await
    }

    fn supports_sync(&self) -> bool {
        true
    }

    async fn send_sync(&mut self) -> Result<()> {
        ArtNetSender::send_sync(self).await
    }
}

#[async_trait]
impl DmxSender for SacnSender {
    async fn send_raw(&mut self, frame: &[u8]) -> Result<()> {
        SacnSender::send_raw(self, frame).await
    }
}

/// Creates senders for universes; custom factories take precedence
/// over the built-in protocol selection
#[async_trait]
pub trait SenderFactory: Send + Sync {
    async fn create(&self, universe: u16) -> Result<Box<dyn DmxSender>>;
}

/// Which built-in sender the controller creates per universe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DmxProtocol {
    #[default]
    Sacn,
    ArtNet,
}

/// Configuration for a [`DmxController`]
///
/// The per-protocol sections carry the full sender settings; the
/// universe field of each is overridden per added universe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DmxControllerConfig {
    /// Built-in sender selection
    pub protocol: DmxProtocol,
    /// Follow each flush that sent something with one ArtSync pulse
    pub art_sync: bool,
    /// Art-Net sender settings
    pub artnet: ArtNetSenderConfig,
    /// sACN sender settings
    pub sacn: SacnSenderConfig,
}

/// DMX controller: universes plus their senders
pub struct DmxController {
    config: DmxControllerConfig,
    factory: Option<Box<dyn SenderFactory>>,
    universes: HashMap<u16, Universe>,
    senders: HashMap<u16, Box<dyn DmxSender>>,
}

impl DmxController {
    /// Create a controller using the built-in protocol senders
    pub fn new(config: DmxControllerConfig) -> Self {
        Self {
            config,
            factory: None,
            universes: HashMap::new(),
            senders: HashMap::new(),
        }
    }

    /// Create a controller with a custom sender factory
    pub fn with_factory(config: DmxControllerConfig, factory: Box<dyn SenderFactory>) -> Self {
        Self {
            config,
            factory: Some(factory),
            universes: HashMap::new(),
            senders: HashMap::new(),
        }
    }

    /// Register a universe and create its sender; idempotent
    pub async fn add_universe(&mut self, universe: u16) -> Result<()> {
        if !self.universes.contains_key(&universe) {
            self.universes.insert(universe, Universe::new(universe)?);
        }
        if !self.senders.contains_key(&universe) {
            let sender = self.create_sender(universe).await?;
            self.senders.insert(universe, sender);
            tracing::info!("controller added universe {}", universe);
        }
        Ok(())
    }

    async fn create_sender(&self, universe: u16) -> Result<Box<dyn DmxSender>> {
        if let Some(factory) = &self.factory {
            return factory.create(universe).await;
        }
        match self.config.protocol {
            DmxProtocol::ArtNet => {
                let config = ArtNetSenderConfig {
                    universe,
                    ..self.config.artnet.clone()
                };
                Ok(Box::new(ArtNetSender::new(config).await?))
            }
            DmxProtocol::Sacn => {
                let config = SacnSenderConfig {
                    universe,
                    ..self.config.sacn.clone()
                };
                Ok(Box::new(SacnSender::new(config).await?))
            }
        }
    }

    /// The ids of all registered universes, sorted
    pub fn universes(&self) -> Vec<u16> {
        let mut ids: Vec<u16> = self.universes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Borrow one universe's buffer
    pub fn universe(&self, universe: u16) -> Option<&Universe> {
        self.universes.get(&universe)
    }

    /// Write one channel of a registered universe
    pub fn set_channel(&mut self, universe: u16, channel: u16, value: f64) -> Result<()> {
        let buffer = self.universes.get_mut(&universe).ok_or(
            luxflow_core::CoreError::InvalidUniverse {
                universe: universe as u32,
            },
        )?;
        buffer.set_channel(channel, value)?;
        Ok(())
    }

    /// Replace a registered universe's frame
    pub fn set_frame(&mut self, universe: u16, frame: &[u8]) -> Result<()> {
        let buffer = self.universes.get_mut(&universe).ok_or(
            luxflow_core::CoreError::InvalidUniverse {
                universe: universe as u32,
            },
        )?;
        buffer.set_frame(frame);
        Ok(())
    }

    /// Send dirty universes (or everything with `force`)
    ///
    /// Targets one universe when `target` is set, otherwise scans all.
    /// Returns how many universes were sent. With `art_sync` enabled
    /// and at least one send, exactly one sync pulse follows, on the
    /// first sender that supports it.
    pub async fn flush(&mut self, target: Option<u16>, force: bool) -> Result<usize> {
        let targets: Vec<u16> = match target {
            Some(universe) => vec![universe],
            None => self.universes(),
        };

        let mut sent = 0usize;
        for universe in targets {
            let Some(buffer) = self.universes.get_mut(&universe) else {
                continue;
            };
            if !buffer.is_dirty() && !force {
                continue;
            }
            let Some(sender) = self.senders.get_mut(&universe) else {
                continue;
            };
            sender.send_raw(buffer.frame()).await?;
            buffer.consume_dirty();
            sent += 1;
        }

        if self.config.art_sync && sent > 0 {
            for universe in self.universes() {
                if let Some(sender) = self.senders.get_mut(&universe) {
                    if sender.supports_sync() {
                        sender.send_sync().await?;
                        break;
                    }
                }
            }
        }

        tracing::debug!("flush sent {} universe(s)", sent);
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counters {
        frames: AtomicUsize,
        syncs: AtomicUsize,
        last_frame: std::sync::Mutex<Vec<u8>>,
    }

    struct RecordingSender {
        counters: Arc<Counters>,
        sync_capable: bool,
    }

    #[async_trait]
    impl DmxSender for RecordingSender {
        async fn send_raw(&mut self, frame: &[u8]) -> Result<()> {
            self.counters.frames.fetch_add(1, Ordering::SeqCst);
            *self.counters.last_frame.lock().unwrap() = frame.to_vec();
            Ok(())
        }

        fn supports_sync(&self) -> bool {
            self.sync_capable
        }

        async fn send_sync(&mut self) -> Result<()> {
            self.counters.syncs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct RecordingFactory {
        counters: Arc<Counters>,
        sync_capable: bool,
    }

    #[async_trait]
    impl SenderFactory for RecordingFactory {
        async fn create(&self, _universe: u16) -> Result<Box<dyn DmxSender>> {
            Ok(Box::new(RecordingSender {
                counters: Arc::clone(&self.counters),
                sync_capable: self.sync_capable,
            }))
        }
    }

    fn controller(art_sync: bool, counters: &Arc<Counters>) -> DmxController {
        DmxController::with_factory(
            DmxControllerConfig {
                art_sync,
                ..Default::default()
            },
            Box::new(RecordingFactory {
                counters: Arc::clone(counters),
                sync_capable: true,
            }),
        )
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = DmxControllerConfig {
            protocol: DmxProtocol::ArtNet,
            art_sync: true,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"artnet\""));
        let back: DmxControllerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.protocol, DmxProtocol::ArtNet);
        assert!(back.art_sync);
    }

    #[tokio::test]
    async fn test_add_universe_is_idempotent() {
        let counters = Arc::new(Counters::default());
        let mut controller = controller(false, &counters);
        controller.add_universe(1).await.unwrap();
        controller.add_universe(1).await.unwrap();
        assert_eq!(controller.universes(), vec![1]);
    }

    #[tokio::test]
    async fn test_flush_sends_only_dirty_universes() {
        let counters = Arc::new(Counters::default());
        let mut controller = controller(false, &counters);
        controller.add_universe(1).await.unwrap();
        controller.add_universe(2).await.unwrap();

        controller.set_channel(1, 1, 255.0).unwrap();
        let sent = controller.flush(None, false).await.unwrap();

        assert_eq!(sent, 1);
        assert_eq!(counters.frames.load(Ordering::SeqCst), 1);
        assert_eq!(counters.last_frame.lock().unwrap()[0], 255);

        // Nothing dirty: nothing sent.
        let sent = controller.flush(None, false).await.unwrap();
        assert_eq!(sent, 0);
    }

    #[tokio::test]
    async fn test_flush_force_sends_everything() {
        let counters = Arc::new(Counters::default());
        let mut controller = controller(false, &counters);
        controller.add_universe(1).await.unwrap();
        controller.add_universe(2).await.unwrap();

        let sent = controller.flush(None, true).await.unwrap();
        assert_eq!(sent, 2);
    }

    #[tokio::test]
    async fn test_flush_targets_one_universe() {
        let counters = Arc::new(Counters::default());
        let mut controller = controller(false, &counters);
        controller.add_universe(1).await.unwrap();
        controller.add_universe(2).await.unwrap();
        controller.set_channel(1, 1, 10.0).unwrap();
        controller.set_channel(2, 1, 10.0).unwrap();

        let sent = controller.flush(Some(2), false).await.unwrap();
        assert_eq!(sent, 1);
        // Universe 1 stays dirty for the next flush.
        assert!(controller.universe(1).unwrap().is_dirty());
        assert!(!controller.universe(2).unwrap().is_dirty());
    }

    #[tokio::test]
    async fn test_art_sync_pulse_fires_once_after_send() {
        let counters = Arc::new(Counters::default());
        let mut controller = controller(true, &counters);
        controller.add_universe(1).await.unwrap();
        controller.add_universe(2).await.unwrap();
        controller.set_channel(1, 1, 1.0).unwrap();
        controller.set_channel(2, 1, 1.0).unwrap();

        controller.flush(None, false).await.unwrap();
        assert_eq!(counters.syncs.load(Ordering::SeqCst), 1);

        // A flush that sends nothing emits no sync.
        controller.flush(None, false).await.unwrap();
        assert_eq!(counters.syncs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_set_channel_on_unknown_universe_fails() {
        let counters = Arc::new(Counters::default());
        let mut controller = controller(false, &counters);
        assert!(controller.set_channel(1, 1, 1.0).is_err());
    }

    #[tokio::test]
    async fn test_invalid_universe_id_rejected() {
        let counters = Arc::new(Counters::default());
        let mut controller = controller(false, &counters);
        assert!(controller.add_universe(0).await.is_err());
        assert!(controller.add_universe(64000).await.is_err());
    }
}
