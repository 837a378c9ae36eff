//! # DriftMQ Client Library — Producer Core
//!
//! The async Rust producer for the DriftMQ message broker.
//!
//! ## Features
//!
//! - **Batching**: Nagle-style coalescing across concurrent callers, firing
//!   on a submission-count threshold or a delay window, whichever comes first
//! - **Backpressure**: a bounded ingress queue suspends producers instead of
//!   growing without limit
//! - **Fan-out**: submissions are regrouped by acknowledgement class and
//!   broker route, one wire request per route group
//! - **Failure isolation**: a faulted route fails its own acknowledgement
//!   group; other groups in the same batch are unaffected
//! - **Lossless shutdown**: graceful stop drains the queue and resolves
//!   every accepted submission
//! - **Zero-copy payloads**: message keys and values are `bytes::Bytes`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use driftmq_client::{Message, Producer, ProducerConfig, SendOptions};
//! use std::sync::Arc;
//!
//! # async fn example(router: Arc<dyn driftmq_client::BrokerRouter>) -> driftmq_client::Result<()> {
//! let producer = Producer::new(router, ProducerConfig::default());
//!
//! let delivery = producer
//!     .send_messages(
//!         "my-topic",
//!         vec![Message::new("Hello DriftMQ!").with_key("user-123")],
//!         SendOptions::default().acks(-1),
//!     )
//!     .await?;
//!
//! for response in delivery.await? {
//!     println!("partition {} offset {}", response.partition, response.offset);
//! }
//!
//! producer.stop(true).await;
//! # Ok(())
//! # }
//! ```
//!
//! Routing and transport are consumed as traits: a [`BrokerRouter`] maps
//! `(topic, key)` to a [`Route`] carrying a [`BrokerConnection`] to the
//! partition leader. The crate ships no socket code of its own.

pub mod config;
pub mod connection;
pub mod error;
pub mod metadata;
pub mod metrics;
pub mod producer;
pub mod protocol;
pub mod queue;
pub mod router;

pub use config::{ProducerConfig, ProducerConfigBuilder, SendOptions};
pub use connection::BrokerConnection;
pub use error::{DriftmqClientError, ErrorCode};
pub use metadata::MetadataQueries;
pub use metrics::{MetricsSnapshot, ProducerMetrics};
pub use producer::{DeliveryFuture, Producer};
pub use protocol::{
    CompressionType, Message, Offset, OffsetResponse, PartitionId, PartitionMetadata, Payload,
    ProduceRequest, ProduceResponse, TopicMetadata, TopicName,
};
pub use queue::IngressQueue;
pub use router::{BrokerRouter, Route, RouteKey};

/// Client library result type
pub type Result<T> = std::result::Result<T, DriftmqClientError>;

/// Client library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
