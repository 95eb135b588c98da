//! An in-memory message broker, that can be used in place of a [`WebSocketConnector`](super::transport::WebSocketConnector) in tests

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::stomp::Frame;
use super::transport::{Connector, Link, TransportError};
use super::NotificationEvent;

#[derive(Default)]
struct BrokerState {
    /// Every frame clients sent, in order
    received: Vec<Frame>,
    /// Live links, as (link number, sender of the messages this link will receive)
    links: Vec<(usize, UnboundedSender<String>)>,
    opened: usize,
    refuse_connections: bool,
    /// Do not answer CONNECT and SUBSCRIBE frames
    silent: bool,
    /// The `heart-beat` header of CONNECTED, in milliseconds
    heart_beat: (u64, u64),
    /// Heart-beats clients sent
    pings: usize,
}

/// A fake STOMP broker.
///
/// It answers CONNECT with CONNECTED and SUBSCRIBE with the RECEIPT it asked for.
/// It never sends heart-beats itself, even when it announced some (see [`set_heart_beat`](Self::set_heart_beat)).
#[derive(Clone, Default)]
pub struct MockBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        match self.state.lock() {
            Ok(s) => s,
            Err(p) => p.into_inner(),
        }
    }

    /// Make subsequent connection attempts fail (or succeed again)
    pub fn refuse_connections(&self, refuse: bool) {
        self.lock().refuse_connections = refuse;
    }

    /// Stop answering CONNECT and SUBSCRIBE frames
    pub fn set_silent(&self, silent: bool) {
        self.lock().silent = silent;
    }

    /// The `heart-beat` header of the next CONNECTED frames. `(0, 0)` (the default) disables heart-beats
    pub fn set_heart_beat(&self, outgoing_ms: u64, incoming_ms: u64) {
        self.lock().heart_beat = (outgoing_ms, incoming_ms);
    }

    /// How many heart-beats clients sent so far
    pub fn pings(&self) -> usize {
        self.lock().pings
    }

    /// How many links have been opened so far
    pub fn opened_links(&self) -> usize {
        self.lock().opened
    }

    pub fn live_links(&self) -> usize {
        self.lock().links.len()
    }

    /// The frames clients sent with the given command
    pub fn received(&self, command: &str) -> Vec<Frame> {
        self.lock().received.iter()
            .filter(|frame| frame.command() == command)
            .cloned()
            .collect()
    }

    /// Send a raw text message to every live link
    pub fn push_raw(&self, text: &str) {
        for (_, sender) in &self.lock().links {
            let _ = sender.send(text.to_string());
        }
    }

    /// Deliver a notification to every live link, as a STOMP MESSAGE on the subscribed destination
    pub fn publish(&self, event: &NotificationEvent) {
        match serde_json::to_string(event) {
            Err(err) => log::error!("Unable to serialize {}: {}", event, err),
            Ok(body) => self.publish_body(&body),
        }
    }

    /// Deliver a MESSAGE frame with an arbitrary body to every live link
    pub fn publish_body(&self, body: &str) {
        let state = self.lock();
        let destination = state.received.iter().rev()
            .find(|frame| frame.command() == "SUBSCRIBE")
            .and_then(|frame| frame.get("destination").map(|d| d.to_string()))
            .unwrap_or_default();
        for (_, sender) in &state.links {
            let frame = Frame::new("MESSAGE")
                .header("destination", &destination)
                .header("subscription", "sub-0")
                .header("message-id", uuid::Uuid::new_v4().to_hyphenated())
                .header("content-type", "application/json")
                .body(body);
            let _ = sender.send(frame.encode());
        }
    }

    /// Close every live link from the broker side
    pub fn drop_links(&self) {
        self.lock().links.clear();
    }
}

#[async_trait]
impl Connector for MockBroker {
    async fn open(&self) -> Result<Box<dyn Link>, TransportError> {
        let mut state = self.lock();
        if state.refuse_connections {
            return Err("Connection refused by mocked broker".into());
        }
        let number = state.opened;
        state.opened += 1;
        let (sender, inbox) = unbounded_channel();
        state.links.push((number, sender));
        Ok(Box::new(MockLink { number, broker: self.clone(), inbox }))
    }
}

struct MockLink {
    number: usize,
    broker: MockBroker,
    inbox: UnboundedReceiver<String>,
}

impl MockLink {
    fn reply(state: &BrokerState, number: usize, frame: Frame) {
        if let Some((_, sender)) = state.links.iter().find(|(n, _)| *n == number) {
            let _ = sender.send(frame.encode());
        }
    }
}

#[async_trait]
impl Link for MockLink {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        let mut state = self.broker.lock();
        if state.links.iter().any(|(n, _)| *n == self.number) == false {
            return Err("Link closed".into());
        }
        if Frame::is_heartbeat(&text) {
            state.pings += 1;
            return Ok(());
        }
        let frame = Frame::parse(&text).map_err(|err| err.to_string())?;

        if state.silent == false {
            match frame.command() {
                "CONNECT" => {
                    let (outgoing, incoming) = state.heart_beat;
                    let connected = Frame::new("CONNECTED")
                        .header("version", "1.2")
                        .header("heart-beat", format!("{},{}", outgoing, incoming));
                    Self::reply(&state, self.number, connected);
                },
                "SUBSCRIBE" => {
                    if let Some(receipt) = frame.get("receipt") {
                        Self::reply(&state, self.number, Frame::new("RECEIPT").header("receipt-id", receipt));
                    }
                },
                _ => {},
            }
        }
        state.received.push(frame);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        self.inbox.recv().await.map(Ok)
    }

    async fn close(&mut self) {
        let number = self.number;
        self.broker.lock().links.retain(|(n, _)| *n != number);
    }
}
