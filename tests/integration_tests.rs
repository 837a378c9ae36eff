//! End-to-end producer pipeline tests against fake router and connections

use async_trait::async_trait;
use driftmq_client::{
    BrokerConnection, BrokerRouter, CompressionType, DriftmqClientError, Message, MetadataQueries,
    OffsetResponse, PartitionId, PartitionMetadata, ProduceRequest, ProduceResponse, Producer,
    ProducerConfig, Result, Route, SendOptions, TopicMetadata,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Scriptable in-memory broker connection
struct FakeConnection {
    endpoint: String,
    fail: bool,
    delay: Duration,
    requests: Mutex<Vec<ProduceRequest>>,
    next_offset: AtomicI64,
}

impl FakeConnection {
    fn with(endpoint: &str, fail: bool, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            endpoint: endpoint.to_string(),
            fail,
            delay,
            requests: Mutex::new(Vec::new()),
            next_offset: AtomicI64::new(0),
        })
    }

    fn new(endpoint: &str) -> Arc<Self> {
        Self::with(endpoint, false, Duration::ZERO)
    }

    fn failing(endpoint: &str) -> Arc<Self> {
        Self::with(endpoint, true, Duration::ZERO)
    }

    fn slow(endpoint: &str, delay: Duration) -> Arc<Self> {
        Self::with(endpoint, false, delay)
    }

    fn requests(&self) -> Vec<ProduceRequest> {
        self.requests.lock().clone()
    }

    fn message_count(&self) -> usize {
        self.requests.lock().iter().map(|r| r.message_count()).sum()
    }
}

#[async_trait]
impl BrokerConnection for FakeConnection {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, request: ProduceRequest) -> Result<Vec<ProduceResponse>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.requests.lock().push(request.clone());
        if self.fail {
            return Err(DriftmqClientError::connection("wire dropped"));
        }
        if request.acks == 0 {
            return Ok(Vec::new());
        }
        let mut responses = Vec::new();
        for payload in &request.payloads {
            let offset = self
                .next_offset
                .fetch_add(payload.messages.len() as i64, Ordering::SeqCst);
            responses.push(ProduceResponse {
                topic: payload.topic.clone(),
                partition: payload.partition,
                offset,
                error_code: 0,
            });
        }
        Ok(responses)
    }
}

/// Scriptable router: fixed routes by message key or topic, with optional
/// per-topic routing failures
struct FakeRouter {
    default_route: (Arc<FakeConnection>, PartitionId),
    by_key: HashMap<Vec<u8>, (Arc<FakeConnection>, PartitionId)>,
    by_topic: HashMap<String, (Arc<FakeConnection>, PartitionId)>,
    fail_topics: Vec<String>,
}

impl FakeRouter {
    fn new(default_connection: Arc<FakeConnection>) -> Self {
        Self {
            default_route: (default_connection, 0),
            by_key: HashMap::new(),
            by_topic: HashMap::new(),
            fail_topics: Vec::new(),
        }
    }

    fn route_key(mut self, key: &str, connection: Arc<FakeConnection>, partition: PartitionId) -> Self {
        self.by_key
            .insert(key.as_bytes().to_vec(), (connection, partition));
        self
    }

    fn route_topic(
        mut self,
        topic: &str,
        connection: Arc<FakeConnection>,
        partition: PartitionId,
    ) -> Self {
        self.by_topic
            .insert(topic.to_string(), (connection, partition));
        self
    }

    fn fail_topic(mut self, topic: &str) -> Self {
        self.fail_topics.push(topic.to_string());
        self
    }
}

#[async_trait]
impl MetadataQueries for FakeRouter {
    async fn get_topic(&self, name: &str) -> Result<TopicMetadata> {
        Ok(TopicMetadata {
            name: name.to_string(),
            error_code: 0,
            partitions: vec![PartitionMetadata {
                id: 0,
                leader: Some(1),
                replicas: vec![1],
                isr: vec![1],
            }],
        })
    }

    async fn get_topic_offsets(
        &self,
        topic: &str,
        max_offsets: i32,
        _time: i64,
    ) -> Result<Vec<OffsetResponse>> {
        Ok(vec![OffsetResponse {
            topic: topic.to_string(),
            partition: 0,
            offsets: (0..max_offsets as i64).collect(),
        }])
    }
}

impl BrokerRouter for FakeRouter {
    fn select_broker_route(&self, topic: &str, key: Option<&[u8]>) -> Result<Route> {
        if self.fail_topics.iter().any(|t| t == topic) {
            return Err(DriftmqClientError::TopicNotFound {
                topic: topic.to_string(),
            });
        }
        let (connection, partition) = key
            .and_then(|k| self.by_key.get(k))
            .or_else(|| self.by_topic.get(topic))
            .unwrap_or(&self.default_route);
        Ok(Route {
            topic: topic.to_string(),
            partition_id: *partition,
            connection: Arc::clone(connection) as Arc<dyn BrokerConnection>,
        })
    }
}

fn quick_config() -> ProducerConfig {
    ProducerConfig::builder()
        .batch_delay(Duration::from_millis(10))
        .build()
}

#[tokio::test]
async fn test_single_message_happy_path() {
    let connection = FakeConnection::new("broker-1:9092");
    let router = Arc::new(FakeRouter::new(Arc::clone(&connection)));
    let producer = Producer::new(router, quick_config());

    let delivery = producer
        .send_messages("t", vec![Message::new("m1")], SendOptions::default())
        .await
        .unwrap();
    let responses = delivery.await.unwrap();

    assert_eq!(
        responses,
        vec![ProduceResponse {
            topic: "t".to_string(),
            partition: 0,
            offset: 0,
            error_code: 0,
        }]
    );

    let requests = connection.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].acks, 1);
    assert_eq!(requests[0].timeout_ms, 1000);
    assert_eq!(requests[0].payloads.len(), 1);
    let payload = &requests[0].payloads[0];
    assert_eq!(payload.topic, "t");
    assert_eq!(payload.partition, 0);
    assert_eq!(payload.codec, CompressionType::None);
    assert_eq!(payload.messages, vec![Message::new("m1")]);

    producer.stop(true).await;
}

#[tokio::test]
async fn test_fan_out_across_partitions() {
    let conn_a = FakeConnection::new("broker-1:9092");
    let conn_b = FakeConnection::new("broker-2:9092");
    let router = Arc::new(
        FakeRouter::new(Arc::clone(&conn_a))
            .route_key("k1", Arc::clone(&conn_a), 0)
            .route_key("k2", Arc::clone(&conn_b), 1),
    );
    let producer = Producer::new(router, quick_config());

    let delivery = producer
        .send_messages(
            "t",
            vec![
                Message::new("m1").with_key("k1"),
                Message::new("m2").with_key("k2"),
            ],
            SendOptions::default(),
        )
        .await
        .unwrap();
    let responses = delivery.await.unwrap();

    assert_eq!(responses.len(), 2);
    let mut partitions: Vec<_> = responses.iter().map(|r| r.partition).collect();
    partitions.sort_unstable();
    assert_eq!(partitions, vec![0, 1]);

    // One request per route, each carrying a single message.
    assert_eq!(conn_a.requests().len(), 1);
    assert_eq!(conn_b.requests().len(), 1);
    assert_eq!(conn_a.message_count(), 1);
    assert_eq!(conn_b.message_count(), 1);

    producer.stop(true).await;
}

#[tokio::test]
async fn test_coalescing_across_callers() {
    let connection = FakeConnection::new("broker-1:9092");
    let router = Arc::new(FakeRouter::new(Arc::clone(&connection)));
    let config = ProducerConfig::builder()
        .batch_size(10)
        .batch_delay(Duration::from_millis(200))
        .build();
    let producer = Producer::new(router, config);

    let mut deliveries = Vec::new();
    for i in 0..5 {
        let delivery = producer
            .send_messages(
                "t",
                vec![Message::new(format!("m{}", i))],
                SendOptions::default(),
            )
            .await
            .unwrap();
        deliveries.push(delivery);
    }

    for delivery in deliveries {
        delivery.await.unwrap();
    }

    // All five submissions share one dispatch cycle and one wire request.
    let requests = connection.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].message_count(), 5);
    assert_eq!(producer.metrics().batches_dispatched, 1);

    producer.stop(true).await;
}

#[tokio::test]
async fn test_acks_zero_resolves_empty() {
    let connection = FakeConnection::new("broker-1:9092");
    let router = Arc::new(FakeRouter::new(Arc::clone(&connection)));
    let producer = Producer::new(router, quick_config());

    let delivery = producer
        .send_messages("t", vec![Message::new("m1")], SendOptions::default().acks(0))
        .await
        .unwrap();
    let responses = delivery.await.unwrap();

    assert!(responses.is_empty());
    assert_eq!(connection.requests()[0].acks, 0);

    producer.stop(true).await;
}

#[tokio::test]
async fn test_send_failure_is_isolated_to_its_ack_group() {
    let good = FakeConnection::new("broker-1:9092");
    let bad = FakeConnection::failing("broker-2:9092");
    let router = Arc::new(
        FakeRouter::new(Arc::clone(&good))
            .route_topic("good", Arc::clone(&good), 0)
            .route_topic("bad", Arc::clone(&bad), 0),
    );
    let config = ProducerConfig::builder()
        .batch_delay(Duration::from_millis(200))
        .build();
    let producer = Producer::new(router, config);

    // Different acks put the two submissions in different wire request
    // classes within the same dispatch cycle.
    let failing = producer
        .send_messages("bad", vec![Message::new("m1")], SendOptions::default())
        .await
        .unwrap();
    let succeeding = producer
        .send_messages(
            "good",
            vec![Message::new("m2")],
            SendOptions::default().acks(-1),
        )
        .await
        .unwrap();

    let err = failing.await.unwrap_err();
    match err {
        DriftmqClientError::SendFailed { route, message } => {
            assert_eq!(route, "bad/0@broker-2:9092");
            assert!(message.contains("wire dropped"));
        }
        other => panic!("expected SendFailed, got {:?}", other),
    }

    let responses = succeeding.await.unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].topic, "good");

    assert_eq!(producer.metrics().send_errors, 1);
    producer.stop(true).await;
}

#[tokio::test]
async fn test_graceful_stop_resolves_residual_submissions() {
    let connection = FakeConnection::new("broker-1:9092");
    let router = Arc::new(FakeRouter::new(Arc::clone(&connection)));
    let config = ProducerConfig::builder()
        .batch_size(100)
        .batch_delay(Duration::from_secs(10))
        .build();
    let producer = Producer::new(router, config);

    let mut deliveries = Vec::new();
    for i in 0..7 {
        let delivery = producer
            .send_messages(
                "t",
                vec![Message::new(format!("m{}", i))],
                SendOptions::default(),
            )
            .await
            .unwrap();
        deliveries.push(delivery);
    }

    let started = Instant::now();
    producer.stop(true).await;
    assert!(started.elapsed() < Duration::from_secs(5));

    for delivery in deliveries {
        delivery.await.unwrap();
    }

    assert_eq!(connection.message_count(), 7);
    assert_eq!(producer.in_flight_message_count(), 0);
}

#[tokio::test]
async fn test_active_counter_returns_to_baseline() {
    let connection = FakeConnection::new("broker-1:9092");
    let router = Arc::new(FakeRouter::new(Arc::clone(&connection)));
    let producer = Producer::new(router, quick_config());

    assert_eq!(producer.in_flight_message_count(), 0);

    let mut deliveries = Vec::new();
    for size in [1usize, 3, 2] {
        let messages: Vec<_> = (0..size).map(|i| Message::new(format!("m{}", i))).collect();
        deliveries.push(
            producer
                .send_messages("t", messages, SendOptions::default())
                .await
                .unwrap(),
        );
    }

    for delivery in deliveries {
        delivery.await.unwrap();
    }

    assert_eq!(producer.in_flight_message_count(), 0);
    let metrics = producer.metrics();
    assert_eq!(metrics.records_queued, 6);
    assert_eq!(metrics.records_dispatched, 6);

    producer.stop(true).await;
}

#[tokio::test]
async fn test_backpressure_suspends_send_at_capacity() {
    let connection = FakeConnection::slow("broker-1:9092", Duration::from_millis(200));
    let router = Arc::new(FakeRouter::new(Arc::clone(&connection)));
    let config = ProducerConfig::builder()
        .max_message_buffer(1)
        .batch_size(1)
        .batch_delay(Duration::from_millis(1))
        .build();
    let producer = Producer::new(router, config);

    // First submission is picked up by the dispatch loop, which then sits
    // in the slow connection; the second fills the queue.
    let first = producer
        .send_messages("t", vec![Message::new("m1")], SendOptions::default())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = producer
        .send_messages("t", vec![Message::new("m2")], SendOptions::default())
        .await
        .unwrap();

    let blocked_producer = producer.clone();
    let third = tokio::spawn(async move {
        blocked_producer
            .send_messages("t", vec![Message::new("m3")], SendOptions::default())
            .await
            .unwrap()
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!third.is_finished(), "third send should wait for queue space");

    first.await.unwrap();
    second.await.unwrap();
    third.await.unwrap().await.unwrap();

    assert_eq!(connection.message_count(), 3);
    producer.stop(true).await;
}

#[tokio::test]
async fn test_send_after_close_is_rejected() {
    let connection = FakeConnection::new("broker-1:9092");
    let router = Arc::new(FakeRouter::new(connection));
    let producer = Producer::new(router, quick_config());

    producer.close().await;
    producer.close().await;

    let err = producer
        .send_messages("t", vec![Message::new("m1")], SendOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DriftmqClientError::ProducerDisposed));
}

#[tokio::test]
async fn test_stop_and_close_are_idempotent() {
    let connection = FakeConnection::new("broker-1:9092");
    let router = Arc::new(FakeRouter::new(connection));
    let producer = Producer::new(router, quick_config());

    producer.stop(true).await;
    producer.stop(true).await;
    producer.close().await;
    producer.stop(false).await;
    producer.close().await;
}

#[tokio::test]
async fn test_empty_submission_resolves_with_empty_list() {
    let connection = FakeConnection::new("broker-1:9092");
    let router = Arc::new(FakeRouter::new(Arc::clone(&connection)));
    let config = ProducerConfig::builder()
        .batch_delay(Duration::from_millis(100))
        .build();
    let producer = Producer::new(router, config);

    // Co-batched with a non-empty submission to the same topic: the empty
    // one still resolves with an empty list, not its neighbour's responses.
    let empty = producer
        .send_messages("t", Vec::new(), SendOptions::default())
        .await
        .unwrap();
    let full = producer
        .send_messages("t", vec![Message::new("m1")], SendOptions::default())
        .await
        .unwrap();

    assert!(empty.await.unwrap().is_empty());
    assert_eq!(full.await.unwrap().len(), 1);
    assert_eq!(producer.in_flight_message_count(), 0);

    producer.stop(true).await;
}

#[tokio::test]
async fn test_same_topic_submissions_share_responses() {
    let connection = FakeConnection::new("broker-1:9092");
    let router = Arc::new(
        FakeRouter::new(Arc::clone(&connection))
            .route_key("k1", Arc::clone(&connection), 0)
            .route_key("k2", Arc::clone(&connection), 1),
    );
    let config = ProducerConfig::builder()
        .batch_delay(Duration::from_millis(200))
        .build();
    let producer = Producer::new(router, config);

    let first = producer
        .send_messages(
            "t",
            vec![Message::new("m1").with_key("k1")],
            SendOptions::default(),
        )
        .await
        .unwrap();
    let second = producer
        .send_messages(
            "t",
            vec![Message::new("m2").with_key("k2")],
            SendOptions::default(),
        )
        .await
        .unwrap();

    // The demux joins responses to submissions by topic, so co-batched
    // same-topic submissions see each other's partition responses.
    let mut first_responses = first.await.unwrap();
    let mut second_responses = second.await.unwrap();
    first_responses.sort_by_key(|r| r.partition);
    second_responses.sort_by_key(|r| r.partition);

    assert_eq!(first_responses.len(), 2);
    assert_eq!(first_responses, second_responses);

    producer.stop(true).await;
}

#[tokio::test]
async fn test_router_failure_fails_the_ack_group() {
    let connection = FakeConnection::new("broker-1:9092");
    let router = Arc::new(FakeRouter::new(Arc::clone(&connection)).fail_topic("missing"));
    let config = ProducerConfig::builder()
        .batch_delay(Duration::from_millis(200))
        .build();
    let producer = Producer::new(router, config);

    // Same acks and timeout: both submissions share the failing group.
    let doomed = producer
        .send_messages("missing", vec![Message::new("m1")], SendOptions::default())
        .await
        .unwrap();
    let collateral = producer
        .send_messages("t", vec![Message::new("m2")], SendOptions::default())
        .await
        .unwrap();

    assert!(matches!(
        doomed.await.unwrap_err(),
        DriftmqClientError::SendFailed { .. }
    ));
    assert!(matches!(
        collateral.await.unwrap_err(),
        DriftmqClientError::SendFailed { .. }
    ));

    assert_eq!(producer.in_flight_message_count(), 0);
    assert!(connection.requests().is_empty());

    producer.stop(true).await;
}

#[tokio::test]
async fn test_metadata_facade_passes_through() {
    let connection = FakeConnection::new("broker-1:9092");
    let router = Arc::new(FakeRouter::new(connection));
    let producer = Producer::new(router, quick_config());

    let topic = producer.get_topic("t").await.unwrap();
    assert_eq!(topic.name, "t");
    assert_eq!(topic.partitions.len(), 1);

    let offsets = producer.get_topic_offsets("t", 2, -1).await.unwrap();
    assert_eq!(offsets.len(), 1);
    assert_eq!(offsets[0].offsets, vec![0, 1]);

    producer.stop(true).await;
}

#[tokio::test]
async fn test_custom_codec_and_timeout_reach_the_wire() {
    let connection = FakeConnection::new("broker-1:9092");
    let router = Arc::new(FakeRouter::new(Arc::clone(&connection)));
    let producer = Producer::new(router, quick_config());

    let delivery = producer
        .send_messages(
            "t",
            vec![Message::new("m1")],
            SendOptions::default()
                .acks(2)
                .timeout(Duration::from_millis(250))
                .codec(CompressionType::Lz4),
        )
        .await
        .unwrap();
    delivery.await.unwrap();

    let requests = connection.requests();
    assert_eq!(requests[0].acks, 2);
    assert_eq!(requests[0].timeout_ms, 250);
    assert_eq!(requests[0].payloads[0].codec, CompressionType::Lz4);

    producer.stop(true).await;
}
