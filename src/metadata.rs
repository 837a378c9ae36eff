//! Cluster metadata queries
//!
//! Consumed by the producer and re-exposed as a pass-through façade
//! ([`Producer::get_topic`](crate::producer::Producer::get_topic),
//! [`Producer::get_topic_offsets`](crate::producer::Producer::get_topic_offsets)).

use crate::protocol::{OffsetResponse, TopicMetadata};
use crate::Result;
use async_trait::async_trait;

/// Topic and offset lookups against the cluster
#[async_trait]
pub trait MetadataQueries: Send + Sync {
    /// Get metadata for a topic
    async fn get_topic(&self, name: &str) -> Result<TopicMetadata>;

    /// Get up to `max_offsets` offsets per partition of `topic` at `time`
    /// (a broker timestamp selector, with the usual `-1` latest / `-2`
    /// earliest sentinels)
    async fn get_topic_offsets(
        &self,
        topic: &str,
        max_offsets: i32,
        time: i64,
    ) -> Result<Vec<OffsetResponse>>;
}
