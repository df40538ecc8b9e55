//! [`InProcessBus`]: an in-process [`BusClient`] backed by two `mpsc`
//! channels, for tests and for running the CLI without a real buxtehude
//! server.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};

use crate::error::BusError;

use super::BusClient;

/// One side of an in-process bus pair: publishing on one sends to the
/// other's inbound queue, and vice versa. Build a connected pair with
/// [`InProcessBus::pair`].
pub struct InProcessBus {
    connected: AtomicBool,
    outbound: mpsc::UnboundedSender<(String, Value)>,
    inbound: Mutex<mpsc::UnboundedReceiver<(String, Value)>>,
}

impl InProcessBus {
    /// Two [`InProcessBus`]es wired so each one's `publish` delivers to the
    /// other's `next_message`, both starting already connected.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();
        (
            Self { connected: AtomicBool::new(true), outbound: tx_a, inbound: Mutex::new(rx_b) },
            Self { connected: AtomicBool::new(true), outbound: tx_b, inbound: Mutex::new(rx_a) },
        )
    }

    /// Simulate a disconnect: subsequent `publish`/`next_message` calls fail
    /// until [`InProcessBus::connect`] is called again.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl BusClient for InProcessBus {
    async fn connect(&self) -> Result<(), BusError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn publish(&self, dest: &str, payload: Value) -> Result<(), BusError> {
        if !self.is_connected().await {
            return Err(BusError::Disconnected);
        }
        self.outbound
            .send((dest.to_owned(), payload))
            .map_err(|e| BusError::SendFailed(e.to_string()))
    }

    async fn next_message(&self) -> Result<(String, Value), BusError> {
        if !self.is_connected().await {
            return Err(BusError::Disconnected);
        }
        let mut inbound = self.inbound.lock().await;
        inbound.recv().await.ok_or(BusError::Disconnected)
    }
}
