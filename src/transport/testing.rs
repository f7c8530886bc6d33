//! Test doubles for the transport seam, shared by channel, mount, and
//! workspace tests.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use crate::error::TransportError;
use crate::transport::channel::{Connector, Transport, TransportEvent, WireMessage};

#[derive(Default)]
struct FakeState {
    connects: Vec<String>,
    senders: Vec<Sender<TransportEvent>>,
    sent: Vec<WireMessage>,
    shutdowns: usize,
}

/// Connector whose transports record sends and let tests inject events.
#[derive(Default)]
pub struct FakeConnector {
    state: Arc<Mutex<FakeState>>,
}

impl FakeConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Report the latest connection attempt as open.
    pub fn open(&self) {
        self.send_event_latest(TransportEvent::Open);
    }

    /// Report attempt `idx` (0-based) as open. Stale pipes are fine: events
    /// into an abandoned attempt simply go nowhere.
    pub fn open_attempt(&self, idx: usize) {
        let state = self.state.lock().unwrap();
        if let Some(sender) = state.senders.get(idx) {
            let _ = sender.send(TransportEvent::Open);
        }
    }

    /// Deliver output bytes on the latest attempt.
    pub fn deliver(&self, bytes: &[u8]) {
        self.send_event_latest(TransportEvent::Data(bytes.to_vec()));
    }

    /// Deliver output bytes on attempt `idx` (0-based).
    pub fn deliver_attempt(&self, idx: usize, bytes: &[u8]) {
        let state = self.state.lock().unwrap();
        if let Some(sender) = state.senders.get(idx) {
            let _ = sender.send(TransportEvent::Data(bytes.to_vec()));
        }
    }

    /// Close the latest attempt with an optional close code.
    pub fn close(&self, code: Option<u16>) {
        self.send_event_latest(TransportEvent::Closed { code });
    }

    /// Fail the latest attempt.
    pub fn fail(&self, reason: &str) {
        self.send_event_latest(TransportEvent::Failed(reason.to_string()));
    }

    /// How many transports were opened.
    pub fn connect_count(&self) -> usize {
        self.state.lock().unwrap().connects.len()
    }

    /// URLs passed to `connect`, in order.
    pub fn connected_urls(&self) -> Vec<String> {
        self.state.lock().unwrap().connects.clone()
    }

    /// All messages sent through any transport, in order.
    pub fn sent(&self) -> Vec<WireMessage> {
        self.state.lock().unwrap().sent.clone()
    }

    /// How many transports were shut down.
    pub fn shutdowns(&self) -> usize {
        self.state.lock().unwrap().shutdowns
    }

    fn send_event_latest(&self, event: TransportEvent) {
        let state = self.state.lock().unwrap();
        if let Some(sender) = state.senders.last() {
            let _ = sender.send(event);
        }
    }
}

impl Connector for FakeConnector {
    fn connect(&self, url: &str, events: Sender<TransportEvent>) -> Box<dyn Transport> {
        let mut state = self.state.lock().unwrap();
        state.connects.push(url.to_string());
        state.senders.push(events);
        Box::new(FakeTransport {
            state: self.state.clone(),
        })
    }
}

struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

impl Transport for FakeTransport {
    fn send(&mut self, msg: WireMessage) -> Result<(), TransportError> {
        self.state.lock().unwrap().sent.push(msg);
        Ok(())
    }

    fn shutdown(&mut self) {
        self.state.lock().unwrap().shutdowns += 1;
    }
}
