//! Request routing and the worker pool.
//!
//! The listener classifies each sample by key and pushes a [`Job`] onto a
//! bounded queue. A fixed number of workers drain the queue, run the
//! handler and publish the response on `<prefix>/<category>/response`.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use zenoh::handlers::FifoChannelHandler;
use zenoh::pubsub::Subscriber;
use zenoh::sample::Sample;

use zensight_bridge_framework::{BridgeError, Publisher};
use zensight_common::{RESPONSE_SEGMENT, relative_key, request_wildcard, response_key};

use crate::device::TagSession;
use crate::handler::{self, BridgeContext};
use crate::messages::{MethodResponse, ReadResponse, SubscriptionResponse, WriteResponse};

/// Request categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Read,
    Write,
    Method,
    Subscribe,
}

impl RequestKind {
    /// Key segment of the category, also used for its response key.
    pub fn category(self) -> &'static str {
        match self {
            RequestKind::Read => "read",
            RequestKind::Write => "write",
            RequestKind::Method => "method",
            RequestKind::Subscribe => "subscribe",
        }
    }
}

/// What to do with an inbound sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Our own response traffic.
    Ignore,
    Dispatch(RequestKind),
    Unknown,
}

const CATEGORIES: [RequestKind; 4] = [
    RequestKind::Read,
    RequestKind::Write,
    RequestKind::Method,
    RequestKind::Subscribe,
];

/// Classify a key relative to the bridge prefix by substring, in priority
/// order: response, read, write, method, subscribe.
pub fn classify(relative: &str) -> Route {
    if relative.contains(RESPONSE_SEGMENT) {
        return Route::Ignore;
    }

    CATEGORIES
        .iter()
        .find(|kind| relative.contains(kind.category()))
        .map_or(Route::Unknown, |kind| Route::Dispatch(*kind))
}

/// A queued request.
#[derive(Debug, Clone)]
pub struct Job {
    pub kind: RequestKind,
    pub topic: String,
    pub payload: Vec<u8>,
}

/// A response document of any category.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    Read(ReadResponse),
    Write(WriteResponse),
    Method(MethodResponse),
    Subscribe(SubscriptionResponse),
}

impl Response {
    pub fn success(&self) -> bool {
        match self {
            Response::Read(r) => r.success,
            Response::Write(r) => r.success,
            Response::Method(r) => r.success,
            Response::Subscribe(r) => r.success,
        }
    }

    pub fn error_message(&self) -> &str {
        match self {
            Response::Read(r) => &r.error_message,
            Response::Write(r) => &r.error_message,
            Response::Method(r) => &r.error_message,
            Response::Subscribe(r) => &r.error_message,
        }
    }
}

/// Run the handler for a job.
pub async fn process<S: TagSession>(ctx: &BridgeContext<S>, job: &Job) -> Response {
    match job.kind {
        RequestKind::Read => Response::Read(handler::handle_read(ctx, &job.payload).await),
        RequestKind::Write => Response::Write(handler::handle_write(ctx, &job.payload).await),
        RequestKind::Method => Response::Method(handler::handle_method(&job.payload)),
        RequestKind::Subscribe => Response::Subscribe(handler::handle_subscribe(&job.payload)),
    }
}

/// Subscription on `<prefix>/**`.
pub type RequestSubscriber = Subscriber<FifoChannelHandler<Sample>>;

/// Shared receiving end of the job queue.
pub type JobReceiver = Arc<Mutex<mpsc::Receiver<Job>>>;

/// Create the bounded job queue.
pub fn job_queue(capacity: usize) -> (mpsc::Sender<Job>, JobReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (tx, Arc::new(Mutex::new(rx)))
}

/// Classifies samples and enqueues jobs.
#[derive(Debug, Clone)]
pub struct Router {
    key_prefix: String,
    queue: mpsc::Sender<Job>,
}

impl Router {
    pub fn new(key_prefix: impl Into<String>, queue: mpsc::Sender<Job>) -> Self {
        Self {
            key_prefix: key_prefix.into(),
            queue,
        }
    }

    /// Declare the subscription on `<prefix>/**`.
    pub async fn listen(
        &self,
        session: &zenoh::Session,
    ) -> Result<RequestSubscriber, BridgeError> {
        let key_expr = request_wildcard(&self.key_prefix);
        let subscriber = session
            .declare_subscriber(&key_expr)
            .await
            .map_err(|e| BridgeError::Subscribe {
                key: key_expr.clone(),
                message: e.to_string(),
            })?;

        info!(key = %key_expr, "Listening for requests");
        Ok(subscriber)
    }

    /// Route one sample. Returns `false` once the workers are gone.
    pub async fn route(&self, topic: &str, payload: Vec<u8>) -> bool {
        let kind = match classify(relative_key(&self.key_prefix, topic)) {
            Route::Dispatch(kind) => kind,
            Route::Ignore => {
                debug!(topic = %topic, "Ignoring response traffic");
                return true;
            }
            Route::Unknown => {
                warn!(topic = %topic, "Unknown request topic, dropping");
                return true;
            }
        };

        let job = Job {
            kind,
            topic: topic.to_string(),
            payload,
        };

        match self.queue.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(
                    topic = %topic,
                    capacity = self.queue.max_capacity(),
                    "Request queue full, waiting for a worker"
                );
                self.queue.send(job).await.is_ok()
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

/// Feed the router from `subscriber` until the subscription or the queue
/// closes.
pub async fn run_listener(subscriber: RequestSubscriber, router: Router) {
    while let Ok(sample) = subscriber.recv_async().await {
        let topic = sample.key_expr().as_str().to_string();
        let payload = sample.payload().to_bytes().to_vec();
        if !router.route(&topic, payload).await {
            warn!("Request queue closed, stopping listener");
            break;
        }
    }

    debug!(prefix = %router.key_prefix, "Listener stopped");
}

/// Drain the queue until it closes, publishing one response per job.
pub async fn run_worker<S: TagSession>(
    id: usize,
    ctx: BridgeContext<S>,
    jobs: JobReceiver,
    publisher: Publisher,
) {
    debug!(worker = id, "Worker started");

    loop {
        let job = jobs.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };

        let response = process(&ctx, &job).await;
        if !response.success() {
            debug!(
                worker = id,
                topic = %job.topic,
                error = %response.error_message(),
                "Request failed"
            );
        }

        let key = response_key(publisher.key_prefix(), job.kind.category());
        publisher.respond(&key, &response).await;
    }

    debug!(worker = id, "Worker stopped");
}
