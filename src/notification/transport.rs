//! The text-frame transport the notification channel runs STOMP over

use std::error::Error;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub type TransportError = Box<dyn Error + Send + Sync>;

/// Something that can open [`Link`]s to the message broker
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self) -> Result<Box<dyn Link>, TransportError>;
}

/// An open, bidirectional connection that carries text messages
#[async_trait]
pub trait Link: Send {
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// The next text message.
    ///
    /// Returns `None` once the peer has closed the link.
    /// This must be cancel-safe: dropping the returned future before it completes must not lose a message.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    async fn close(&mut self);
}


/// Opens WebSocket connections, e.g. to the raw WebSocket endpoint of a SockJS mount
#[derive(Clone, Debug)]
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    pub fn new<S: ToString>(url: S) -> Self {
        Self { url: url.to_string() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn open(&self) -> Result<Box<dyn Link>, TransportError> {
        log::debug!("Opening WebSocket to {}", self.url);
        let (stream, _response) = tokio_tungstenite::connect_async(self.url.as_str()).await?;
        Ok(Box::new(WebSocketLink { stream }))
    }
}

struct WebSocketLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Link for WebSocketLink {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await {
                None => return None,
                Some(Err(err)) => return Some(Err(err.into())),
                Some(Ok(Message::Text(text))) => return Some(Ok(text)),
                Some(Ok(Message::Binary(bytes))) => {
                    return Some(String::from_utf8(bytes).map_err(|err| err.into()));
                },
                Some(Ok(Message::Close(frame))) => {
                    log::debug!("WebSocket closed by peer: {:?}", frame);
                    return None;
                },
                // Ping and pong are answered by tungstenite itself
                Some(Ok(_)) => continue,
            }
        }
    }

    async fn close(&mut self) {
        if let Err(err) = self.stream.close(None).await {
            log::debug!("Error while closing WebSocket: {}", err);
        }
    }
}
