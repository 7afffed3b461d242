//! PUB Socket Transport
//!
//! The registry only needs three things from the underlying transport: bind a
//! socket to an address, unbind it again, and send one multipart message.
//! `ZmqPubSocket` provides them over ZeroMQ PUB sockets.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::debug;
use zeromq::{Endpoint, Socket, SocketSend, ZmqMessage};

/// Errors reported by a PUB socket
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("ZeroMQ error: {0}")]
    Zmq(#[from] zeromq::ZmqError),

    #[error("Socket is not bound")]
    NotBound,

    #[error("Transport failure: {0}")]
    Other(String),
}

/// A two-frame pub/sub message: topic name, then payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frames {
    pub topic: Bytes,
    pub payload: Bytes,
}

impl Frames {
    /// Create the frames for a topic and payload
    pub fn new(topic: &str, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: Bytes::copy_from_slice(topic.as_bytes()),
            payload: payload.into(),
        }
    }

    /// Topic frame as a string, if it is valid UTF-8
    pub fn topic_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.topic).ok()
    }
}

/// Capabilities the endpoint registry needs from a PUB socket
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PubSocket: Send {
    /// Bind the socket to `address`. Resolves once the socket is listening.
    async fn bind(&mut self, address: &str) -> Result<(), TransportError>;

    /// Unbind the address bound by the last successful `bind`
    async fn unbind(&mut self) -> Result<(), TransportError>;

    /// Send both frames as one atomic multipart message
    async fn send(&mut self, frames: Frames) -> Result<(), TransportError>;
}

/// Creates one socket per distinct endpoint address
pub trait SocketFactory: Send {
    fn create(&mut self, address: &str) -> Box<dyn PubSocket>;
}

/// ZeroMQ PUB socket
pub struct ZmqPubSocket {
    socket: zeromq::PubSocket,
    endpoint: Option<Endpoint>,
}

impl ZmqPubSocket {
    pub fn new() -> Self {
        Self {
            socket: zeromq::PubSocket::new(),
            endpoint: None,
        }
    }
}

impl Default for ZmqPubSocket {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PubSocket for ZmqPubSocket {
    async fn bind(&mut self, address: &str) -> Result<(), TransportError> {
        let endpoint = self.socket.bind(address).await?;
        debug!(address, resolved = ?endpoint, "PUB socket bound");
        self.endpoint = Some(endpoint);
        Ok(())
    }

    async fn unbind(&mut self) -> Result<(), TransportError> {
        let endpoint = self.endpoint.take().ok_or(TransportError::NotBound)?;
        self.socket.unbind(endpoint).await?;
        Ok(())
    }

    async fn send(&mut self, frames: Frames) -> Result<(), TransportError> {
        let mut message = ZmqMessage::from(frames.topic);
        message.push_back(frames.payload);
        self.socket.send(message).await?;
        Ok(())
    }
}

/// Factory producing real ZeroMQ PUB sockets
#[derive(Debug, Default, Clone, Copy)]
pub struct ZmqSocketFactory;

impl SocketFactory for ZmqSocketFactory {
    fn create(&mut self, address: &str) -> Box<dyn PubSocket> {
        debug!(address, "Creating ZeroMQ PUB socket");
        Box::new(ZmqPubSocket::new())
    }
}
