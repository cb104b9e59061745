//! Server setup and lifecycle management

use crate::admin::{AdminClient, InheritanceRegistry, LoggingInheritanceRegistry};
use crate::api::rest::state::{AppState, WebhookState};
use crate::api::{create_router, create_webhook_router};
use crate::config::{DaemonConfig, QueueConfig};
use crate::error::{DaemonError, DaemonResult};
use crate::gates::{
    AcceptAllValidator, AllowAllAuthorizer, Authorizer, NamespaceRegistry, OpenNamespaces,
    SchemaValidator,
};
use crate::services::{ConfigService, Gates};
use cfgplane_placement::{
    AgentQueue, HttpAgentQueue, InMemoryNodeRegistry, LoggingAgentQueue, Node, NodeRegistry,
    PlacementEngine, ReplyHandler,
};
use cfgplane_store::{InMemoryKv, KvBackend, KvConfigStore, KvPlacementStore};
use cfgplane_types::{Clock, ConfigGroup, Org, StandaloneConfig, SystemClock};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// External collaborators the daemon is assembled from
pub struct Wiring {
    pub kv: Arc<dyn KvBackend>,
    pub registry: Arc<dyn NodeRegistry>,
    pub queue: Arc<dyn AgentQueue>,
    pub authorizer: Arc<dyn Authorizer>,
    pub validator: Arc<dyn SchemaValidator>,
    pub namespaces: Arc<dyn NamespaceRegistry>,
    pub inheritance: Arc<dyn InheritanceRegistry>,
    pub clock: Arc<dyn Clock>,
}

impl Wiring {
    /// Collaborators described by the configuration, with allow-all gates
    pub fn from_config(config: &DaemonConfig) -> DaemonResult<Self> {
        let registry = InMemoryNodeRegistry::new();
        for (org, nodes) in &config.registry.orgs {
            let org = Org::new(org.as_str());
            for node in nodes {
                let mut entry = Node::new(node.id.as_str());
                entry.labels = node.labels.clone();
                registry.register(&org, entry);
            }
        }

        let queue: Arc<dyn AgentQueue> = match &config.queue {
            QueueConfig::Log => Arc::new(LoggingAgentQueue),
            QueueConfig::Http { url, timeout_secs } => Arc::new(
                HttpAgentQueue::new(url.as_str(), Duration::from_secs(*timeout_secs))
                    .map_err(|e| DaemonError::Config(format!("Invalid agent queue: {e}")))?,
            ),
        };

        Ok(Self {
            kv: Arc::new(InMemoryKv::new()),
            registry: Arc::new(registry),
            queue,
            authorizer: Arc::new(AllowAllAuthorizer),
            validator: Arc::new(AcceptAllValidator),
            namespaces: Arc::new(OpenNamespaces),
            inheritance: Arc::new(LoggingInheritanceRegistry),
            clock: Arc::new(SystemClock),
        })
    }
}

/// Handler states built from a [`Wiring`]
pub struct Components {
    pub api: AppState,
    pub webhooks: WebhookState,
    pub admin_worker: JoinHandle<()>,
}

impl Components {
    /// Assemble stores, engine and services. Must run inside a Tokio runtime.
    pub fn build(config: &DaemonConfig, wiring: Wiring) -> Self {
        let standalone_store = Arc::new(KvConfigStore::<StandaloneConfig>::new(wiring.kv.clone()));
        let group_store = Arc::new(KvConfigStore::<ConfigGroup>::new(wiring.kv.clone()));
        let task_store = Arc::new(KvPlacementStore::new(wiring.kv));

        let engine = Arc::new(PlacementEngine::new(
            standalone_store.clone(),
            group_store.clone(),
            task_store,
            wiring.registry,
            wiring.queue,
            wiring.clock.clone(),
            config.placement.engine_config(),
        ));

        let (admin, admin_worker) =
            AdminClient::spawn(wiring.inheritance, config.admin.channel_capacity);

        let gates = Gates {
            authorizer: wiring.authorizer,
            validator: wiring.validator,
            namespaces: wiring.namespaces,
            admin,
            clock: wiring.clock,
        };

        let standalone = Arc::new(ConfigService::<StandaloneConfig>::new(
            standalone_store,
            engine.clone(),
            gates.clone(),
        ));
        let groups = Arc::new(ConfigService::<ConfigGroup>::new(group_store, engine.clone(), gates));

        Self {
            api: AppState::new(standalone, groups),
            webhooks: WebhookState::new(ReplyHandler::new(engine)),
            admin_worker,
        }
    }
}

/// cfgplane daemon server
pub struct Server {
    config: DaemonConfig,
    components: Components,
}

impl Server {
    /// Create a new server with the given configuration
    pub fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let wiring = Wiring::from_config(&config)?;
        Ok(Self::with_wiring(config, wiring))
    }

    /// Create a server around explicitly supplied collaborators
    pub fn with_wiring(config: DaemonConfig, wiring: Wiring) -> Self {
        let components = Components::build(&config, wiring);
        Self { config, components }
    }

    /// Run both listeners until a shutdown signal arrives
    pub async fn run(self) -> DaemonResult<()> {
        let api_addr = self.config.server.listen_addr;
        let webhook_addr = self.config.server.webhook_addr;

        let app = create_router(self.components.api, &self.config.server);
        let webhooks = create_webhook_router(self.components.webhooks);

        let api_listener = TcpListener::bind(api_addr).await?;
        let webhook_listener = TcpListener::bind(webhook_addr).await?;

        tracing::info!("cfgplane API listening on {}", api_addr);
        tracing::info!("cfgplane reply webhooks listening on {}", webhook_addr);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        });

        let api = axum::serve(api_listener, app)
            .with_graceful_shutdown(wait_for(shutdown_rx.clone()))
            .into_future();
        let hooks = axum::serve(webhook_listener, webhooks)
            .with_graceful_shutdown(wait_for(shutdown_rx))
            .into_future();

        tokio::try_join!(api, hooks).map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("cfgplane daemon shutting down");
        self.components.admin_worker.abort();

        Ok(())
    }
}

async fn wait_for(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
