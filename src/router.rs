//! Broker routing seam
//!
//! The router owns topic metadata discovery, partition selection and
//! connection pooling; the producer core asks it for one thing: the route
//! for a `(topic, key)` pair.

use crate::connection::BrokerConnection;
use crate::metadata::MetadataQueries;
use crate::protocol::{PartitionId, TopicName};
use crate::Result;
use std::fmt;
use std::sync::Arc;

/// Destination for one message: the partition it lands on and a connection
/// to that partition's leader
#[derive(Clone)]
pub struct Route {
    pub topic: TopicName,
    pub partition_id: PartitionId,
    pub connection: Arc<dyn BrokerConnection>,
}

impl Route {
    /// Hashable identity of this route's destination, used to regroup
    /// messages that share a wire request
    pub fn key(&self) -> RouteKey {
        RouteKey {
            endpoint: self.connection.endpoint().to_string(),
            partition_id: self.partition_id,
        }
    }

    /// Human-readable destination for logs and error reports
    pub fn describe(&self) -> String {
        format!(
            "{}/{}@{}",
            self.topic,
            self.partition_id,
            self.connection.endpoint()
        )
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("topic", &self.topic)
            .field("partition_id", &self.partition_id)
            .field("endpoint", &self.connection.endpoint())
            .finish()
    }
}

/// Identity of a route's destination broker and partition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub endpoint: String,
    pub partition_id: PartitionId,
}

/// Topic metadata discovery, partition selection and connection pooling
pub trait BrokerRouter: MetadataQueries {
    /// Select the broker route for a message with the given key.
    ///
    /// Failure here fails the whole dispatch group the message belongs to;
    /// the producer core does not retry.
    fn select_broker_route(&self, topic: &str, key: Option<&[u8]>) -> Result<Route>;
}
