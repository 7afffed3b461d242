//! Endpoint Registry
//!
//! Maps topic names to PUB endpoints. Several topics may share one address,
//! in which case they share one socket and are told apart by the topic frame.
//! The registry owns every socket and drives their bind/unbind lifecycle.

use std::collections::HashMap;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::transport::{Frames, PubSocket, SocketFactory, TransportError};

/// Errors that can occur in the endpoint registry
#[derive(Error, Debug)]
pub enum SocketError {
    #[error("Topic '{0}' is already registered")]
    DuplicateTopic(String),

    #[error("Topic name cannot be empty")]
    EmptyTopic,

    #[error("Endpoint address for topic '{0}' cannot be empty")]
    EmptyAddress(String),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: TransportError,
    },

    #[error("Failed to unbind {address}: {source}")]
    Unbind {
        address: String,
        #[source]
        source: TransportError,
    },

    #[error("Failed to send on topic '{topic}': {source}")]
    Send {
        topic: String,
        #[source]
        source: TransportError,
    },
}

/// One PUB socket and the address it binds to
struct Endpoint {
    address: String,
    socket: Box<dyn PubSocket>,
    bound: bool,
}

/// Topic → endpoint multiplexer
pub struct EndpointRegistry {
    factory: Box<dyn SocketFactory>,
    /// Distinct endpoints in first-registration order
    endpoints: Vec<Endpoint>,
    by_address: HashMap<String, usize>,
    topics: HashMap<String, usize>,
}

impl EndpointRegistry {
    /// Create an empty registry that builds sockets with `factory`
    pub fn new(factory: impl SocketFactory + 'static) -> Self {
        Self::with_boxed_factory(Box::new(factory))
    }

    pub fn with_boxed_factory(factory: Box<dyn SocketFactory>) -> Self {
        Self {
            factory,
            endpoints: Vec::new(),
            by_address: HashMap::new(),
            topics: HashMap::new(),
        }
    }

    /// Register `topic` on the endpoint for `address`
    ///
    /// The socket for `address` is created on first use and is not bound
    /// until `open`. Registering a topic twice is an error and leaves the
    /// registry unchanged.
    pub fn register(&mut self, topic: &str, address: &str) -> Result<(), SocketError> {
        if topic.is_empty() {
            return Err(SocketError::EmptyTopic);
        }
        if address.is_empty() {
            return Err(SocketError::EmptyAddress(topic.to_string()));
        }
        if self.topics.contains_key(topic) {
            return Err(SocketError::DuplicateTopic(topic.to_string()));
        }

        let index = match self.by_address.get(address) {
            Some(&index) => index,
            None => {
                let socket = self.factory.create(address);
                self.endpoints.push(Endpoint {
                    address: address.to_string(),
                    socket,
                    bound: false,
                });
                let index = self.endpoints.len() - 1;
                self.by_address.insert(address.to_string(), index);
                index
            }
        };

        self.topics.insert(topic.to_string(), index);
        debug!(topic, address, "Registered topic");
        Ok(())
    }

    /// Check whether a topic has an endpoint
    pub fn has(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    /// Registered topic names, sorted
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = self.topics.keys().map(String::as_str).collect();
        topics.sort_unstable();
        topics
    }

    /// Number of distinct endpoints (and therefore sockets)
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Address a topic is published on
    pub fn address_of(&self, topic: &str) -> Option<&str> {
        self.topics
            .get(topic)
            .map(|&index| self.endpoints[index].address.as_str())
    }

    /// Whether the endpoint for `address` is currently bound
    pub fn is_bound(&self, address: &str) -> bool {
        self.by_address
            .get(address)
            .map(|&index| self.endpoints[index].bound)
            .unwrap_or(false)
    }

    /// Bind every endpoint
    ///
    /// Either every endpoint ends up bound or none of the ones bound by this
    /// call stay bound: on the first failure the endpoints bound so far are
    /// unbound again before the bind error is returned. Endpoints that were
    /// already bound are left alone, so a failed open can be retried.
    pub async fn open(&mut self) -> Result<(), SocketError> {
        let mut newly_bound = Vec::new();

        for index in 0..self.endpoints.len() {
            let endpoint = &mut self.endpoints[index];
            if endpoint.bound {
                continue;
            }

            match endpoint.socket.bind(&endpoint.address).await {
                Ok(()) => {
                    endpoint.bound = true;
                    newly_bound.push(index);
                    info!(address = %endpoint.address, "Endpoint bound");
                }
                Err(source) => {
                    let address = endpoint.address.clone();
                    error!(%address, error = %source, "Failed to bind endpoint");
                    self.rollback(&newly_bound).await;
                    return Err(SocketError::Bind { address, source });
                }
            }
        }

        Ok(())
    }

    async fn rollback(&mut self, indices: &[usize]) {
        for &index in indices.iter().rev() {
            let endpoint = &mut self.endpoints[index];
            if let Err(e) = endpoint.socket.unbind().await {
                warn!(address = %endpoint.address, error = %e, "Rollback unbind failed");
            }
            endpoint.bound = false;
        }
    }

    /// Unbind every bound endpoint
    ///
    /// Keeps going after a failure so every endpoint gets its unbind attempt,
    /// then returns the first error seen.
    pub async fn close(&mut self) -> Result<(), SocketError> {
        let mut first_error = None;

        for endpoint in self.endpoints.iter_mut().filter(|e| e.bound) {
            let result = endpoint.socket.unbind().await;
            endpoint.bound = false;

            match result {
                Ok(()) => info!(address = %endpoint.address, "Endpoint unbound"),
                Err(source) => {
                    error!(address = %endpoint.address, error = %source, "Failed to unbind endpoint");
                    if first_error.is_none() {
                        first_error = Some(SocketError::Unbind {
                            address: endpoint.address.clone(),
                            source,
                        });
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Send `[topic, payload]` on the endpoint registered for `topic`
    ///
    /// Topics without an endpoint are disabled, so sending on them does nothing.
    pub async fn send(&mut self, topic: &str, payload: impl Into<Bytes>) -> Result<(), SocketError> {
        let Some(&index) = self.topics.get(topic) else {
            return Ok(());
        };

        self.endpoints[index]
            .socket
            .send(Frames::new(topic, payload))
            .await
            .map_err(|source| SocketError::Send {
                topic: topic.to_string(),
                source,
            })
    }
}
