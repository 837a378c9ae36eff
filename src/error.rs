//! Error types for the DriftMQ client library

/// Main error type for DriftMQ client operations
///
/// The enum is `Clone` because a single failed produce request terminally
/// resolves every pending submission in its acknowledgement group.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DriftmqClientError {
    /// Connection-related errors
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Protocol-related errors
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Producer rejected the call because it is stopping or stopped
    #[error("Producer is disposed")]
    ProducerDisposed,

    /// The ingress queue was sealed while the submission was being enqueued
    #[error("Ingress queue is sealed")]
    IngressSealed,

    /// A produce request to a broker route faulted
    #[error("Send failed via {route}: {message}")]
    SendFailed { route: String, message: String },

    /// Operation aborted by the stop signal
    #[error("Operation cancelled")]
    Cancelled,

    /// Timeout errors
    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Topic does not exist
    #[error("Topic '{topic}' does not exist")]
    TopicNotFound { topic: String },

    /// Partition does not exist
    #[error("Partition {partition} does not exist for topic '{topic}'")]
    PartitionNotFound { topic: String, partition: i32 },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Broker not available
    #[error("No available brokers")]
    NoBrokersAvailable,

    /// Generic client error
    #[error("{message}")]
    Generic { message: String },
}

impl DriftmqClientError {
    /// Create a new connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a send-failed error carrying the faulting route description
    pub fn send_failed<R: Into<String>, M: Into<String>>(route: R, message: M) -> Self {
        Self::SendFailed {
            route: route.into(),
            message: message.into(),
        }
    }

    /// Create a new invalid config error
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    /// Check if this error is retryable at the caller's layer
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { .. } => true,
            Self::SendFailed { .. } => true,
            Self::Timeout { .. } => true,
            Self::NoBrokersAvailable => true,
            _ => false,
        }
    }

    /// Check if this error was caused by producer shutdown
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::ProducerDisposed | Self::IngressSealed)
    }

    /// Check if this error is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Error code mapping for DriftMQ protocol errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// No error
    None = 0,
    /// Unknown server error
    Unknown = -1,
    /// Offset out of range
    OffsetOutOfRange = 1,
    /// Invalid message
    InvalidMessage = 2,
    /// Unknown topic or partition
    UnknownTopicOrPartition = 3,
    /// Invalid message size
    InvalidMessageSize = 4,
    /// Leader not available
    LeaderNotAvailable = 5,
    /// Not leader for partition
    NotLeaderForPartition = 6,
    /// Request timed out
    RequestTimedOut = 7,
    /// Broker not available
    BrokerNotAvailable = 8,
}

impl ErrorCode {
    /// Convert error code to DriftMQ client error
    pub fn to_client_error(self, context: &str) -> DriftmqClientError {
        match self {
            ErrorCode::None => DriftmqClientError::generic("No error"),
            ErrorCode::Unknown => {
                DriftmqClientError::generic(format!("Unknown error: {}", context))
            }
            ErrorCode::OffsetOutOfRange => {
                DriftmqClientError::protocol(format!("Offset out of range: {}", context))
            }
            ErrorCode::InvalidMessage => {
                DriftmqClientError::protocol(format!("Invalid message: {}", context))
            }
            ErrorCode::UnknownTopicOrPartition => DriftmqClientError::TopicNotFound {
                topic: context.to_string(),
            },
            ErrorCode::InvalidMessageSize => {
                DriftmqClientError::protocol(format!("Invalid message size: {}", context))
            }
            ErrorCode::LeaderNotAvailable => {
                DriftmqClientError::connection(format!("Leader not available: {}", context))
            }
            ErrorCode::NotLeaderForPartition => {
                DriftmqClientError::connection(format!("Not leader for partition: {}", context))
            }
            ErrorCode::RequestTimedOut => DriftmqClientError::timeout(5000),
            ErrorCode::BrokerNotAvailable => DriftmqClientError::NoBrokersAvailable,
        }
    }
}

impl From<i16> for ErrorCode {
    fn from(code: i16) -> Self {
        match code {
            0 => ErrorCode::None,
            -1 => ErrorCode::Unknown,
            1 => ErrorCode::OffsetOutOfRange,
            2 => ErrorCode::InvalidMessage,
            3 => ErrorCode::UnknownTopicOrPartition,
            4 => ErrorCode::InvalidMessageSize,
            5 => ErrorCode::LeaderNotAvailable,
            6 => ErrorCode::NotLeaderForPartition,
            7 => ErrorCode::RequestTimedOut,
            8 => ErrorCode::BrokerNotAvailable,
            _ => ErrorCode::Unknown,
        }
    }
}
