//! Live notifications pushed by the server.
//!
//! A [`NotificationChannel`] keeps a STOMP session open to the broker (reconnecting after drops),
//! subscribes to the per-user notification queue and calls the registered listeners for every event.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

pub mod event;
pub use event::NotificationEvent;
pub mod stomp;
use stomp::Frame;
pub mod transport;
use transport::{Connector, TransportError, WebSocketConnector};
#[cfg(any(test, feature = "mock_api"))]
pub mod mock;

use crate::config::Settings;
use crate::user::UserId;

/// The STOMP subscription ID. There is only one subscription per session
const SUBSCRIPTION_ID: &str = "sub-0";

/// The destination the server pushes the notifications of a user to
pub fn destination(user_id: UserId) -> String {
    format!("/queue/user/{}/notifications", user_id)
}

/// A callback invoked for every received notification
pub type Listener = Arc<dyn Fn(&NotificationEvent) + Send + Sync>;

/// A handle on a registered listener, used to unsubscribe it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// The observable state of a [`NotificationChannel`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// A session has been requested, but the subscription is not acknowledged yet
    Connecting,
    Connected,
}

struct Shared {
    state: ConnectionState,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
    /// Incremented every time a session ends, so that a stale session task can tell it must not touch anything anymore
    epoch: u64,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    match shared.lock() {
        Ok(s) => s,
        Err(p) => p.into_inner(),
    }
}

/// A running session task
struct Session {
    user_id: UserId,
    shutdown: watch::Sender<bool>,
}

/// A client of the per-user notification queue
pub struct NotificationChannel {
    connector: Arc<dyn Connector>,
    settings: Settings,
    shared: Arc<Mutex<Shared>>,
    session: Mutex<Option<Session>>,
}

impl NotificationChannel {
    pub fn new(connector: Arc<dyn Connector>, settings: &Settings) -> Self {
        Self {
            connector,
            settings: settings.clone(),
            shared: Arc::new(Mutex::new(Shared {
                state: ConnectionState::Disconnected,
                listeners: Vec::new(),
                next_listener: 0,
                epoch: 0,
            })),
            session: Mutex::new(None),
        }
    }

    /// A channel that talks to the WebSocket endpoint of `settings.broker_url`
    pub fn with_websocket(settings: &Settings) -> Self {
        Self::new(Arc::new(WebSocketConnector::new(&settings.broker_url)), settings)
    }

    fn session(&self) -> MutexGuard<'_, Option<Session>> {
        match self.session.lock() {
            Ok(s) => s,
            Err(p) => p.into_inner(),
        }
    }

    /// Start a session for `user_id`, authenticated with `token`.
    ///
    /// This returns at once: connection happens in a background task (so this must be called from within a tokio runtime).
    /// Connection failures are never reported here. They are logged, and the session is retried after the reconnect delay,
    /// until [`disconnect`](Self::disconnect) is called.
    ///
    /// This is a no-op when a session already exists.
    pub fn connect(&self, user_id: UserId, token: &str) {
        let mut session = self.session();
        if let Some(existing) = session.as_ref() {
            log::debug!("Notification session already started for user {}, ignoring connect for user {}", existing.user_id, user_id);
            return;
        }

        let epoch = {
            let mut shared = lock(&self.shared);
            shared.state = ConnectionState::Connecting;
            shared.epoch
        };

        let (shutdown, shutdown_rx) = watch::channel(false);
        let ctx = SessionContext {
            connector: Arc::clone(&self.connector),
            settings: self.settings.clone(),
            shared: Arc::clone(&self.shared),
            epoch,
            host: broker_host(&self.settings.broker_url),
            token: token.to_string(),
            destination: destination(user_id),
        };
        log::info!("Starting notification session for user {}", user_id);
        tokio::spawn(async move {
            connection_loop(ctx, shutdown_rx).await;
        });

        *session = Some(Session { user_id, shutdown });
    }

    /// Stop the current session, if any.
    ///
    /// Listeners stay registered, but they will not be called until the next [`connect`](Self::connect)
    pub fn disconnect(&self) {
        let session = self.session().take();
        {
            let mut shared = lock(&self.shared);
            shared.epoch += 1;
            shared.state = ConnectionState::Disconnected;
        }
        if let Some(session) = session {
            log::info!("Stopping notification session for user {}", session.user_id);
            // The task may have exited already
            let _ = session.shutdown.send(true);
        }
    }

    /// Register a listener. Listeners are called in registration order
    pub fn on_notification<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&NotificationEvent) + Send + Sync + 'static,
    {
        let mut shared = lock(&self.shared);
        let id = ListenerId(shared.next_listener);
        shared.next_listener += 1;
        shared.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered (anymore)
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut shared = lock(&self.shared);
        let before = shared.listeners.len();
        shared.listeners.retain(|(listener_id, _)| *listener_id != id);
        shared.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.shared).listeners.len()
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.shared).state
    }

    /// Whether the subscription is currently acknowledged.
    ///
    /// This reflects the last state transition, it does not probe the connection.
    pub fn connection_status(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
}

impl Drop for NotificationChannel {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn broker_host(broker_url: &str) -> String {
    url::Url::parse(broker_url)
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()))
        .unwrap_or_else(|| "localhost".to_string())
}


/// What a session task needs to know
struct SessionContext {
    connector: Arc<dyn Connector>,
    settings: Settings,
    shared: Arc<Mutex<Shared>>,
    epoch: u64,
    host: String,
    token: String,
    destination: String,
}

impl SessionContext {
    fn is_current(&self) -> bool {
        lock(&self.shared).epoch == self.epoch
    }

    fn set_state(&self, state: ConnectionState) {
        let mut shared = lock(&self.shared);
        if shared.epoch == self.epoch && shared.state != state {
            log::debug!("Notification channel: {:?} -> {:?}", shared.state, state);
            shared.state = state;
        }
    }

    /// Call every listener with the event in `body`. Malformed bodies are dropped
    fn dispatch(&self, body: &str) {
        let event = match NotificationEvent::from_json(body) {
            Ok(event) => event,
            Err(err) => {
                log::warn!("Dropping malformed notification ({}): {:?}", err, body);
                return;
            },
        };
        log::info!("Received notification {}", event);

        let listeners: Vec<Listener> = {
            let shared = lock(&self.shared);
            if shared.epoch != self.epoch {
                return;
            }
            shared.listeners.iter().map(|(_, listener)| Arc::clone(listener)).collect()
        };
        // Listeners are called without holding the lock, so that they can (un)subscribe or disconnect
        for listener in listeners {
            if self.is_current() == false {
                log::debug!("Session ended while dispatching {}", event);
                return;
            }
            listener(&event);
        }
    }
}

/// Run sessions until shutdown is requested, waiting for the reconnect delay after every failure
async fn connection_loop(ctx: SessionContext, mut shutdown: watch::Receiver<bool>) {
    let mut attempt: u32 = 0;

    loop {
        match run_session(&ctx, &mut shutdown).await {
            Ok(()) => {
                log::debug!("Notification session ended");
                break;
            },
            Err(err) => {
                log::warn!("Notification session failed (attempt {}): {}", attempt, err);
                attempt += 1;
                ctx.set_state(ConnectionState::Disconnected);
            },
        }

        if ctx.is_current() == false {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(ctx.settings.reconnect_delay()) => {},
            _ = shutdown.changed() => break,
        }
    }
}

/// Open a link, and handle STOMP frames until shutdown (`Ok`) or until the session breaks (`Err`)
async fn run_session(ctx: &SessionContext, shutdown: &mut watch::Receiver<bool>) -> Result<(), TransportError> {
    let mut link = tokio::select! {
        link = ctx.connector.open() => link?,
        _ = shutdown.changed() => return Ok(()),
    };

    let offered = (ctx.settings.heartbeat_outgoing(), ctx.settings.heartbeat_incoming());
    link.send(Frame::connect(&ctx.host, &ctx.token, offered).encode()).await?;

    let receipt = format!("subscribe-{}", ctx.epoch);
    let mut outgoing = Duration::from_millis(0);
    let mut incoming = Duration::from_millis(0);
    // Replaced once the heart-beats are negotiated
    let mut ping = tokio::time::interval(Duration::from_secs(3600));
    let mut last_seen = Instant::now();

    loop {
        let silence_deadline = last_seen + incoming * 2;

        tokio::select! {
            _ = shutdown.changed() => {
                log::debug!("Sending DISCONNECT");
                let _ = link.send(Frame::disconnect().encode()).await;
                link.close().await;
                return Ok(());
            },

            _ = ping.tick(), if outgoing.as_millis() > 0 => {
                link.send("\n".to_string()).await?;
            },

            _ = tokio::time::sleep_until(silence_deadline), if incoming.as_millis() > 0 => {
                link.close().await;
                return Err(format!("No data received from the broker for {:?}", incoming * 2).into());
            },

            text = link.recv() => {
                let text = match text {
                    None => return Err("Connection closed by the broker".into()),
                    Some(result) => result?,
                };
                last_seen = Instant::now();
                if Frame::is_heartbeat(&text) {
                    continue;
                }

                // A message may carry several frames
                for frame in Frame::parse_all(&text) {
                    let frame = match frame {
                        Ok(frame) => frame,
                        Err(err) => {
                            log::warn!("Dropping malformed STOMP frame: {}", err);
                            continue;
                        },
                    };
                    log::trace!("Received STOMP frame {}", frame);

                    match frame.command() {
                        "CONNECTED" => {
                            let negotiated = stomp::negotiate_heartbeat(offered, frame.get("heart-beat"));
                            outgoing = negotiated.0;
                            incoming = negotiated.1;
                            if outgoing.as_millis() > 0 {
                                ping = tokio::time::interval_at(Instant::now() + outgoing, outgoing);
                            }
                            log::debug!("STOMP session established (heart-beats: out {:?}, in {:?})", outgoing, incoming);

                            let wants_receipt = ctx.settings.subscribe_receipt;
                            let subscribe = Frame::subscribe(SUBSCRIPTION_ID, &ctx.destination, if wants_receipt { Some(receipt.as_str()) } else { None });
                            link.send(subscribe.encode()).await?;
                            if wants_receipt == false {
                                ctx.set_state(ConnectionState::Connected);
                            }
                        },
                        "RECEIPT" => {
                            if frame.get("receipt-id") == Some(receipt.as_str()) {
                                log::info!("Subscribed to {}", ctx.destination);
                                ctx.set_state(ConnectionState::Connected);
                            }
                        },
                        "MESSAGE" => {
                            match frame.get("subscription") {
                                Some(id) if id != SUBSCRIPTION_ID => log::debug!("Ignoring message for subscription {}", id),
                                _ => ctx.dispatch(frame.body_text()),
                            }
                        },
                        "ERROR" => {
                            let message = frame.get("message").unwrap_or_else(|| frame.body_text()).to_string();
                            link.close().await;
                            return Err(format!("Broker error: {}", message).into());
                        },
                        other => log::debug!("Ignoring STOMP frame {}", other),
                    }
                }
            },
        }
    }
}
