//! Wire types for DriftMQ produce traffic
//!
//! These are shape-only records: framing, correlation and serialization live
//! behind the [`BrokerConnection`](crate::connection::BrokerConnection) seam.

use bytes::Bytes;

pub type TopicName = String;
pub type PartitionId = i32;
pub type Offset = i64;

/// A single message record with an optional partitioning key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub key: Option<Bytes>,
    pub value: Bytes,
}

impl Message {
    pub fn new<V: Into<Bytes>>(value: V) -> Self {
        Self {
            key: None,
            value: value.into(),
        }
    }

    pub fn with_key<K: Into<Bytes>>(mut self, key: K) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// Compression selectors, Kafka-compatible codec ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i8)]
pub enum CompressionType {
    #[default]
    None = 0,
    Gzip = 1,
    Snappy = 2,
    Lz4 = 3,
    Zstd = 4,
}

impl TryFrom<i8> for CompressionType {
    type Error = crate::error::DriftmqClientError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::Gzip),
            2 => Ok(CompressionType::Snappy),
            3 => Ok(CompressionType::Lz4),
            4 => Ok(CompressionType::Zstd),
            _ => Err(crate::error::DriftmqClientError::protocol(format!(
                "Unsupported compression type: {}",
                value
            ))),
        }
    }
}

impl From<CompressionType> for i8 {
    fn from(codec: CompressionType) -> Self {
        codec as i8
    }
}

/// One topic-partition payload within a produce request
#[derive(Debug, Clone)]
pub struct Payload {
    pub topic: TopicName,
    pub partition: PartitionId,
    pub codec: CompressionType,
    pub messages: Vec<Message>,
}

/// Produce request for sending messages to a partition leader
#[derive(Debug, Clone)]
pub struct ProduceRequest {
    pub acks: i16,
    pub timeout_ms: i32,
    pub payloads: Vec<Payload>,
}

impl ProduceRequest {
    /// Total number of messages across all payloads
    pub fn message_count(&self) -> usize {
        self.payloads.iter().map(|p| p.messages.len()).sum()
    }
}

/// Per-partition answer to a produce request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProduceResponse {
    pub topic: TopicName,
    pub partition: PartitionId,
    pub offset: Offset,
    pub error_code: i16,
}

impl ProduceResponse {
    /// Whether the broker reported success for this partition
    pub fn is_ok(&self) -> bool {
        self.error_code == 0
    }
}

/// Per-partition answer to an offset query
#[derive(Debug, Clone)]
pub struct OffsetResponse {
    pub topic: TopicName,
    pub partition: PartitionId,
    pub offsets: Vec<Offset>,
}

/// Partition metadata as reported by the cluster
#[derive(Debug, Clone)]
pub struct PartitionMetadata {
    pub id: PartitionId,
    pub leader: Option<i32>,
    pub replicas: Vec<i32>,
    pub isr: Vec<i32>,
}

/// Topic metadata as reported by the cluster
#[derive(Debug, Clone)]
pub struct TopicMetadata {
    pub name: TopicName,
    pub error_code: i16,
    pub partitions: Vec<PartitionMetadata>,
}
