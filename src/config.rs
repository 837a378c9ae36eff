//! Configuration types for the DriftMQ producer

use crate::protocol::CompressionType;
use std::time::Duration;

/// Producer configuration
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Capacity of the ingress queue in submissions; `None` means unbounded
    pub max_message_buffer: Option<usize>,
    /// Maximum submissions collected per dispatch cycle
    pub batch_size: usize,
    /// Maximum wait for a dispatch batch to fill once the first submission arrives
    pub batch_delay: Duration,
    /// Cap on how long a graceful stop waits for the dispatch loop to drain
    pub max_stop_wait: Duration,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            max_message_buffer: Some(100),
            batch_size: 10,
            batch_delay: Duration::from_millis(100),
            max_stop_wait: Duration::from_secs(30),
        }
    }
}

impl ProducerConfig {
    /// Create a new builder
    pub fn builder() -> ProducerConfigBuilder {
        ProducerConfigBuilder::default()
    }
}

/// Builder for ProducerConfig
#[derive(Debug, Default)]
pub struct ProducerConfigBuilder {
    config: ProducerConfig,
}

impl ProducerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ingress queue capacity in submissions
    pub fn max_message_buffer(mut self, capacity: usize) -> Self {
        self.config.max_message_buffer = Some(capacity);
        self
    }

    /// Remove the ingress queue capacity bound
    pub fn unbounded_buffer(mut self) -> Self {
        self.config.max_message_buffer = None;
        self
    }

    /// Set the maximum submissions per dispatch cycle
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set the maximum wait for a dispatch batch to fill
    pub fn batch_delay(mut self, delay: Duration) -> Self {
        self.config.batch_delay = delay;
        self
    }

    /// Set the cap on the graceful stop wait
    pub fn max_stop_wait(mut self, wait: Duration) -> Self {
        self.config.max_stop_wait = wait;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ProducerConfig {
        self.config
    }
}

/// Per-call produce options
#[derive(Debug, Clone, Copy)]
pub struct SendOptions {
    /// Acknowledgement requirement: `0` none, `1` leader, `-1` all ISR,
    /// `>= 2` replica count
    pub acks: i16,
    /// Broker-side wait for the acknowledgement requirement
    pub timeout: Duration,
    /// Compression selector for the payload
    pub codec: CompressionType,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            acks: 1,
            timeout: Duration::from_millis(1000),
            codec: CompressionType::None,
        }
    }
}

impl SendOptions {
    pub fn acks(mut self, acks: i16) -> Self {
        self.acks = acks;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn codec(mut self, codec: CompressionType) -> Self {
        self.codec = codec;
        self
    }
}
