//! Batching producer for DriftMQ
//!
//! The producer is an asynchronous ingress-to-broker pipeline. Callers hand
//! submissions to [`Producer::send_messages`]; a single dispatch task
//! collects them from a bounded ingress queue with a Nagle-style time+size
//! trigger, regroups them by acknowledgement class and broker route, issues
//! one wire request per route group, and resolves each caller's
//! [`DeliveryFuture`] from the demultiplexed responses.
//!
//! # Example
//!
//! ```rust,ignore
//! use driftmq_client::{Message, Producer, ProducerConfig, SendOptions};
//! use std::sync::Arc;
//!
//! # async fn example(router: Arc<dyn driftmq_client::BrokerRouter>) -> driftmq_client::Result<()> {
//! let producer = Producer::new(router, ProducerConfig::default());
//!
//! let delivery = producer
//!     .send_messages("my-topic", vec![Message::new("hello")], SendOptions::default())
//!     .await?;
//! let responses = delivery.await?;
//! println!("first offset: {}", responses[0].offset);
//!
//! producer.stop(true).await;
//! # Ok(())
//! # }
//! ```

use crate::config::{ProducerConfig, SendOptions};
use crate::error::DriftmqClientError;
use crate::metadata::MetadataQueries;
use crate::metrics::{MetricsSnapshot, ProducerMetrics};
use crate::protocol::{
    CompressionType, Message, OffsetResponse, Payload, ProduceRequest, ProduceResponse, TopicMetadata,
    TopicName,
};
use crate::queue::IngressQueue;
use crate::router::{BrokerRouter, Route, RouteKey};
use crate::Result;
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One caller-level send and its pending completion
#[derive(Debug)]
struct Submission {
    topic: TopicName,
    messages: Vec<Message>,
    acks: i16,
    timeout: Duration,
    codec: CompressionType,
    completion: oneshot::Sender<Result<Vec<ProduceResponse>>>,
}

impl Submission {
    fn resolve(self, result: Result<Vec<ProduceResponse>>) {
        // The receiver may have been abandoned by the caller.
        let _ = self.completion.send(result);
    }
}

/// Pending result of one [`Producer::send_messages`] call
///
/// Resolves with the broker's per-partition answers for the submission's
/// acknowledgement group, or with the error that failed the group.
#[must_use = "a delivery future does nothing unless awaited"]
#[derive(Debug)]
pub struct DeliveryFuture {
    rx: oneshot::Receiver<Result<Vec<ProduceResponse>>>,
}

impl Future for DeliveryFuture {
    type Output = Result<Vec<ProduceResponse>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(DriftmqClientError::ProducerDisposed)),
            Poll::Pending => Poll::Pending,
        }
    }
}

struct ProducerInner {
    config: ProducerConfig,
    router: Arc<dyn BrokerRouter>,
    ingress: Arc<IngressQueue<Submission>>,
    stop: CancellationToken,
    disposing: AtomicBool,
    disposed: AtomicBool,
    active_count: Arc<AtomicI64>,
    metrics: Arc<ProducerMetrics>,
    dispatch_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ProducerInner {
    fn drop(&mut self) {
        // Last handle gone: let the dispatch loop drain and exit.
        self.ingress.seal();
        self.stop.cancel();
    }
}

/// Thread-safe batching producer
///
/// Cheap to clone; all clones share one ingress queue and dispatch loop.
pub struct Producer {
    inner: Arc<ProducerInner>,
}

impl Clone for Producer {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Producer {
    /// Create a producer over the given router and spawn its dispatch loop
    pub fn new(router: Arc<dyn BrokerRouter>, config: ProducerConfig) -> Self {
        let ingress = Arc::new(IngressQueue::new(config.max_message_buffer));
        let stop = CancellationToken::new();
        let active_count = Arc::new(AtomicI64::new(0));
        let metrics = Arc::new(ProducerMetrics::new());

        let dispatcher = Dispatcher {
            router: Arc::clone(&router),
            ingress: Arc::clone(&ingress),
            stop: stop.clone(),
            active_count: Arc::clone(&active_count),
            metrics: Arc::clone(&metrics),
            batch_size: config.batch_size.max(1),
            batch_delay: config.batch_delay,
        };
        let handle = tokio::spawn(dispatcher.run());

        info!(
            buffer = ?config.max_message_buffer,
            batch_size = config.batch_size,
            batch_delay_ms = config.batch_delay.as_millis() as u64,
            "Producer started"
        );

        Self {
            inner: Arc::new(ProducerInner {
                config,
                router,
                ingress,
                stop,
                disposing: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
                active_count,
                metrics,
                dispatch_handle: Mutex::new(Some(handle)),
            }),
        }
    }

    /// Submit messages for a topic and get a future of the broker's answers
    ///
    /// Suspends while the ingress queue is at capacity. Fails synchronously
    /// with [`DriftmqClientError::ProducerDisposed`] once the producer is
    /// stopping, or [`DriftmqClientError::IngressSealed`] if the queue seals
    /// concurrently; every later failure arrives through the returned
    /// [`DeliveryFuture`] instead.
    pub async fn send_messages<T, I>(
        &self,
        topic: T,
        messages: I,
        options: SendOptions,
    ) -> Result<DeliveryFuture>
    where
        T: Into<TopicName>,
        I: IntoIterator<Item = Message>,
    {
        if self.inner.disposing.load(Ordering::Acquire) {
            return Err(DriftmqClientError::ProducerDisposed);
        }

        let messages: Vec<Message> = messages.into_iter().collect();
        let message_count = messages.len() as i64;
        let (tx, rx) = oneshot::channel();
        let submission = Submission {
            topic: topic.into(),
            messages,
            acks: options.acks,
            timeout: options.timeout,
            codec: options.codec,
            completion: tx,
        };

        self.inner
            .ingress
            .add(submission)
            .await
            .map_err(|_| DriftmqClientError::IngressSealed)?;

        self.inner
            .active_count
            .fetch_add(message_count, Ordering::AcqRel);
        self.inner.metrics.record_queued(message_count as u64);

        Ok(DeliveryFuture { rx })
    }

    /// Submit a single message with default options
    pub async fn send_one<T: Into<TopicName>>(
        &self,
        topic: T,
        message: Message,
    ) -> Result<DeliveryFuture> {
        self.send_messages(topic, [message], SendOptions::default())
            .await
    }

    /// Messages accepted but not yet handed to a broker connection
    pub fn in_flight_message_count(&self) -> i64 {
        self.inner.active_count.load(Ordering::Acquire)
    }

    /// Snapshot of the producer's counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Get metadata for a topic
    pub async fn get_topic(&self, name: &str) -> Result<TopicMetadata> {
        self.inner.router.get_topic(name).await
    }

    /// Get offsets for a topic's partitions
    pub async fn get_topic_offsets(
        &self,
        topic: &str,
        max_offsets: i32,
        time: i64,
    ) -> Result<Vec<OffsetResponse>> {
        self.inner
            .router
            .get_topic_offsets(topic, max_offsets, time)
            .await
    }

    /// Stop accepting submissions and signal the dispatch loop.
    ///
    /// With `wait_for_in_flight` the call waits for the loop to drain and
    /// exit, bounded by [`ProducerConfig::max_stop_wait`]; otherwise it
    /// returns immediately and the loop finishes draining in the background.
    /// Idempotent.
    pub async fn stop(&self, wait_for_in_flight: bool) {
        self.inner.disposing.store(true, Ordering::Release);
        self.inner.ingress.seal();
        self.inner.stop.cancel();

        if wait_for_in_flight {
            let handle = self.inner.dispatch_handle.lock().take();
            if let Some(handle) = handle {
                if tokio::time::timeout(self.inner.config.max_stop_wait, handle)
                    .await
                    .is_err()
                {
                    warn!(
                        max_wait_secs = self.inner.config.max_stop_wait.as_secs(),
                        "Dispatch loop did not drain before the stop wait elapsed"
                    );
                }
            }
        }
    }

    /// Dispose the producer: stop without waiting and release the dispatch
    /// handle. Safe to call after [`Producer::stop`] and safe to call
    /// repeatedly.
    pub async fn close(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.stop(false).await;
        // Detach the loop; it keeps draining until its next exit check.
        drop(self.inner.dispatch_handle.lock().take());
        info!("Producer closed");
    }
}

/// State owned by the spawned dispatch task
struct Dispatcher {
    router: Arc<dyn BrokerRouter>,
    ingress: Arc<IngressQueue<Submission>>,
    stop: CancellationToken,
    active_count: Arc<AtomicI64>,
    metrics: Arc<ProducerMetrics>,
    batch_size: usize,
    batch_delay: Duration,
}

/// Messages bound for one `(route, topic, codec)` wire request
struct InnerGroup {
    route: Route,
    topic: TopicName,
    codec: CompressionType,
    messages: Vec<Message>,
}

impl Dispatcher {
    async fn run(self) {
        debug!("Dispatch loop started");
        loop {
            if self.ingress.is_completed() {
                break;
            }
            match self
                .ingress
                .take_batch(self.batch_size, self.batch_delay, &self.stop)
                .await
            {
                Ok(mut batch) => {
                    if self.ingress.is_sealed() && !self.ingress.is_empty() {
                        batch.extend(self.ingress.drain());
                    }
                    if !batch.is_empty() {
                        self.produce_and_send(batch).await;
                    }
                }
                Err(_) => {
                    let residual = self.ingress.drain();
                    if !residual.is_empty() {
                        self.produce_and_send(residual).await;
                    }
                    break;
                }
            }
        }
        debug!("Dispatch loop exited");
    }

    /// Dispatch one collected batch: group, fan out, demux, resolve.
    ///
    /// Every submission handed in is terminally resolved before this
    /// returns, whatever fails along the way.
    async fn produce_and_send(&self, submissions: Vec<Submission>) {
        self.metrics.record_batch();
        debug!(submissions = submissions.len(), "Dispatching batch");

        // Submissions with different (acks, timeout) cannot share a wire
        // request; each class is sent and resolved independently.
        let mut outer: HashMap<(i16, Duration), Vec<Submission>> = HashMap::new();
        for submission in submissions {
            outer
                .entry((submission.acks, submission.timeout))
                .or_default()
                .push(submission);
        }

        join_all(
            outer
                .into_iter()
                .map(|((acks, timeout), group)| self.send_outer_group(acks, timeout, group)),
        )
        .await;
    }

    async fn send_outer_group(&self, acks: i16, timeout: Duration, submissions: Vec<Submission>) {
        let group_messages: i64 = submissions.iter().map(|s| s.messages.len() as i64).sum();

        let groups = match self.group_by_route(&submissions) {
            Ok(groups) => groups,
            Err(err) => {
                // Nothing was issued; return the whole group to baseline.
                self.active_count
                    .fetch_sub(group_messages, Ordering::AcqRel);
                self.metrics.record_send_error();
                warn!(%err, submissions = submissions.len(), "Route selection failed for batch");
                for submission in submissions {
                    submission.resolve(Err(err.clone()));
                }
                return;
            }
        };

        let mut in_flight = Vec::with_capacity(groups.len());
        for group in groups {
            let message_count = group.messages.len() as i64;
            let request = ProduceRequest {
                acks,
                timeout_ms: timeout.as_millis() as i32,
                payloads: vec![Payload {
                    topic: group.topic,
                    partition: group.route.partition_id,
                    codec: group.codec,
                    messages: group.messages,
                }],
            };

            self.active_count.fetch_sub(message_count, Ordering::AcqRel);
            self.metrics.record_request();

            let descriptor = group.route.describe();
            let connection = Arc::clone(&group.route.connection);
            in_flight.push(async move { (descriptor, connection.send(request).await) });
        }

        let results = join_all(in_flight).await;

        let mut responses: Vec<ProduceResponse> = Vec::new();
        let mut failure: Option<(String, DriftmqClientError)> = None;
        for (descriptor, result) in results {
            match result {
                Ok(mut answered) => responses.append(&mut answered),
                Err(cause) => {
                    if failure.is_none() {
                        failure = Some((descriptor, cause));
                    }
                }
            }
        }

        match failure {
            Some((route, cause)) => {
                self.metrics.record_send_error();
                let err = DriftmqClientError::send_failed(route, cause.to_string());
                warn!(%err, submissions = submissions.len(), "Produce request failed for batch");
                for submission in submissions {
                    submission.resolve(Err(err.clone()));
                }
            }
            None => {
                self.metrics.record_dispatched(group_messages as u64);
                for submission in submissions {
                    // A submission's answers are the responses for its topic,
                    // co-batched neighbours included; empty submissions get
                    // an empty list either way.
                    let selected = if submission.messages.is_empty() {
                        Vec::new()
                    } else {
                        responses
                            .iter()
                            .filter(|r| r.topic == submission.topic)
                            .cloned()
                            .collect()
                    };
                    submission.resolve(Ok(selected));
                }
            }
        }
    }

    /// Flatten submissions to messages and regroup by `(route, topic, codec)`
    fn group_by_route(&self, submissions: &[Submission]) -> Result<Vec<InnerGroup>> {
        let mut groups: HashMap<(RouteKey, TopicName, CompressionType), InnerGroup> =
            HashMap::new();

        for submission in submissions {
            for message in &submission.messages {
                let route = self
                    .router
                    .select_broker_route(&submission.topic, message.key.as_deref())
                    .map_err(|cause| {
                        DriftmqClientError::send_failed(submission.topic.as_str(), cause.to_string())
                    })?;
                let key = (route.key(), submission.topic.clone(), submission.codec);
                groups
                    .entry(key)
                    .or_insert_with(|| InnerGroup {
                        route,
                        topic: submission.topic.clone(),
                        codec: submission.codec,
                        messages: Vec::new(),
                    })
                    .messages
                    .push(message.clone());
            }
        }

        Ok(groups.into_values().collect())
    }
}
