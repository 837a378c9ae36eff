//! Broker connection seam
//!
//! Wire framing, protocol encoding and request/response correlation live
//! behind this trait; the producer core only hands requests over and awaits
//! the per-partition answers.

use crate::protocol::{ProduceRequest, ProduceResponse};
use crate::Result;
use async_trait::async_trait;

/// A connection capable of speaking to one broker
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    /// Address of the broker this connection talks to, used in route
    /// descriptions and error reports
    fn endpoint(&self) -> &str;

    /// Send a produce request and await the broker's per-partition answers.
    ///
    /// For `acks = 0` the broker sends nothing back and the implementation
    /// resolves with an empty list.
    async fn send(&self, request: ProduceRequest) -> Result<Vec<ProduceResponse>>;
}
