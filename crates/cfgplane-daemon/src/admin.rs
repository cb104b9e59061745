//! Inheritance registration worker
//!
//! After a config is created, the namespace is registered as its parent
//! with the external authorization service so namespace grants apply to the
//! config. Registration runs on a background task: `Put` enqueues a request
//! with a completion handler and never waits for, or fails on, the outcome.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Parent → child resource relation to register
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InheritanceRequest {
    pub parent: String,
    pub child: String,
}

/// External administrative service holding resource relations
#[async_trait]
pub trait InheritanceRegistry: Send + Sync {
    async fn add_inheritance(&self, request: &InheritanceRequest) -> anyhow::Result<()>;
}

/// Registry that only logs; for deployments without an authorization service
pub struct LoggingInheritanceRegistry;

#[async_trait]
impl InheritanceRegistry for LoggingInheritanceRegistry {
    async fn add_inheritance(&self, request: &InheritanceRequest) -> anyhow::Result<()> {
        info!(parent = %request.parent, child = %request.child, "Registered inheritance");
        Ok(())
    }
}

type Completion = Box<dyn FnOnce(anyhow::Result<()>) + Send>;

struct Job {
    request: InheritanceRequest,
    on_done: Completion,
}

/// Handle for enqueueing registrations
#[derive(Clone)]
pub struct AdminClient {
    tx: mpsc::Sender<Job>,
}

impl AdminClient {
    /// Start the worker; it stops once every client handle is dropped
    pub fn spawn(registry: Arc<dyn InheritanceRegistry>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Job>(capacity.max(1));

        let handle = tokio::spawn(async move {
            debug!("Admin worker started");
            while let Some(job) = rx.recv().await {
                let result = registry.add_inheritance(&job.request).await;
                (job.on_done)(result);
            }
            debug!("Admin worker stopped");
        });

        (Self { tx }, handle)
    }

    /// Enqueue a registration. Returns false if the queue was full or the
    /// worker is gone; the request is then dropped with a warning.
    pub fn register_inheritance<F>(&self, request: InheritanceRequest, on_done: F) -> bool
    where
        F: FnOnce(anyhow::Result<()>) + Send + 'static,
    {
        let parent = request.parent.clone();
        let child = request.child.clone();
        let job = Job {
            request,
            on_done: Box::new(on_done),
        };

        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(e) => {
                warn!(parent = %parent, child = %child, error = %e, "Dropping inheritance registration");
                false
            }
        }
    }
}
