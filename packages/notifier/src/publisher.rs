//! ZeroMQ Publisher
//!
//! Bridges node events onto the endpoint registry. Transactions go out on
//! `hashtx`/`rawtx`, connected blocks on `hashblock`/`rawblock`. Hashes are
//! sent in display byte order.

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::config::{NotifierConfig, Topic};
use crate::hash::{reverse_hash, HashError};
use crate::node::{NodeEvent, NodeEvents, NodeItem};
use crate::sockets::{EndpointRegistry, SocketError};
use crate::transport::{SocketFactory, ZmqSocketFactory};

/// Errors that can occur during publishing
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Socket(#[from] SocketError),

    #[error(transparent)]
    Hash(#[from] HashError),
}

/// Builds a [`Publisher`] from configuration and a node event stream
pub struct PublisherBuilder {
    config: NotifierConfig,
    events: Option<NodeEvents>,
    factory: Option<Box<dyn SocketFactory>>,
}

impl PublisherBuilder {
    pub fn new(config: NotifierConfig) -> Self {
        Self {
            config,
            events: None,
            factory: None,
        }
    }

    /// Node event stream to consume. Required.
    pub fn events(mut self, events: NodeEvents) -> Self {
        self.events = Some(events);
        self
    }

    /// Override how PUB sockets are created (ZeroMQ by default)
    pub fn socket_factory(mut self, factory: impl SocketFactory + 'static) -> Self {
        self.factory = Some(Box::new(factory));
        self
    }

    /// Register every configured topic and return a closed publisher
    pub fn build(self) -> Result<Publisher, PublishError> {
        let events = self
            .events
            .ok_or_else(|| PublishError::Configuration("publisher requires a node".to_string()))?;

        let factory = self.factory.unwrap_or_else(|| Box::new(ZmqSocketFactory));
        let mut sockets = EndpointRegistry::with_boxed_factory(factory);

        for (topic, address) in self.config.enabled() {
            sockets.register(topic.name(), address)?;
        }

        if sockets.topics().is_empty() {
            info!("No ZeroMQ topics configured, node events will be ignored");
        }

        Ok(Publisher {
            sockets,
            events,
            closed: true,
        })
    }
}

/// Republishes node events as two-frame ZeroMQ messages
pub struct Publisher {
    sockets: EndpointRegistry,
    events: NodeEvents,
    closed: bool,
}

impl Publisher {
    pub fn builder(config: NotifierConfig) -> PublisherBuilder {
        PublisherBuilder::new(config)
    }

    /// Whether events are currently being dropped
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.sockets
    }

    /// Bind every endpoint and start forwarding events
    ///
    /// If any endpoint fails to bind, none stay bound and the publisher stays
    /// closed.
    pub async fn open(&mut self) -> Result<(), PublishError> {
        self.sockets.open().await?;
        self.closed = false;
        info!(topics = ?self.sockets.topics(), "ZeroMQ loaded.");
        Ok(())
    }

    /// Unbind every endpoint and stop forwarding events
    ///
    /// The publisher is closed afterwards even if an unbind failed.
    pub async fn close(&mut self) -> Result<(), PublishError> {
        let result = self.sockets.close().await;
        self.closed = true;
        info!("ZeroMQ closed.");
        result?;
        Ok(())
    }

    /// Publish one node event. Dropped without error while closed.
    pub async fn handle(&mut self, event: NodeEvent) -> Result<(), PublishError> {
        if self.closed {
            trace!(kind = event.kind(), "Publisher closed, dropping event");
            return Ok(());
        }

        match event {
            NodeEvent::Transaction(tx) => {
                self.publish_item(Topic::HashTx, Topic::RawTx, tx.as_ref()).await
            }
            NodeEvent::BlockConnected(block) => {
                self.publish_item(Topic::HashBlock, Topic::RawBlock, block.as_ref())
                    .await
            }
        }
    }

    async fn publish_item(
        &mut self,
        hash_topic: Topic,
        raw_topic: Topic,
        item: &dyn NodeItem,
    ) -> Result<(), PublishError> {
        let hash = reverse_hash(item.hash().as_slice())?;
        self.sockets
            .send(hash_topic.name(), Bytes::copy_from_slice(&hash))
            .await?;

        self.sockets.send(raw_topic.name(), item.to_raw().0).await?;

        debug!(topic = %hash_topic, hash = %hex::encode(hash), "Published");
        Ok(())
    }

    /// Consume node events in order until the node drops its sender
    ///
    /// # Returns
    /// The number of events received, including those dropped while closed
    pub async fn run(&mut self) -> Result<u64, PublishError> {
        let mut received = 0u64;
        while let Some(event) = self.events.recv().await {
            received += 1;
            self.handle(event).await?;
        }
        info!(received, "Node event stream ended");
        Ok(received)
    }
}
