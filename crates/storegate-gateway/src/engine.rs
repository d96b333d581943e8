//! Gateway wiring: one engine instance owns every service and the
//! background task lifecycle.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info};

use storegate_auth::{Gatekeeper, JwtCodec, PolicyTable};
use storegate_core::config::AppConfig;
use storegate_core::config::gateway::GatewayConfig;

use crate::bridge::LifecycleBridge;
use crate::delivery::DeliveryService;
use crate::dispatch::MessageDispatcher;
use crate::pipeline::Pipeline;
use crate::session::{self, SessionRegistry};

/// The fully wired gateway.
///
/// Constructed once at startup and passed around by `Arc`; tests build
/// isolated instances with their own configuration.
pub struct GatewayEngine {
    config: GatewayConfig,
    registry: Arc<SessionRegistry>,
    delivery: Arc<DeliveryService>,
    pipeline: Arc<Pipeline>,
    dispatcher: Arc<MessageDispatcher>,
    bridge: Arc<LifecycleBridge>,
    gatekeeper: Gatekeeper,
    shutdown: broadcast::Sender<()>,
}

impl GatewayEngine {
    /// Wires every gateway service from the application configuration.
    pub fn new(config: &AppConfig) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let delivery = Arc::new(DeliveryService::new(Arc::clone(&registry)));
        let pipeline = Arc::new(Pipeline::standard());
        let dispatcher = Arc::new(MessageDispatcher::new(
            Arc::clone(&pipeline),
            Arc::clone(&delivery),
            config.gateway.dispatch_workers,
        ));
        let bridge = Arc::new(LifecycleBridge::new(
            Arc::clone(&registry),
            Arc::clone(&delivery),
        ));
        let gatekeeper = Gatekeeper::new(JwtCodec::new(&config.auth), PolicyTable::standard());
        let (shutdown, _) = broadcast::channel(1);

        Self {
            config: config.gateway.clone(),
            registry,
            delivery,
            pipeline,
            dispatcher,
            bridge,
            gatekeeper,
            shutdown,
        }
    }

    /// Spawns the expiration sweep, heartbeat, and bookkeeping-cleanup
    /// loops. All of them exit on [`shutdown`](Self::shutdown).
    pub fn start_background_tasks(self: &Arc<Self>) {
        let cfg = &self.config;

        tokio::spawn(session::sweeper::run_sweeper(
            Arc::clone(&self.registry),
            cfg.session_timeout_minutes,
            cfg.inactive_timeout_minutes,
            cfg.sweep_interval_seconds,
            self.shutdown.subscribe(),
        ));
        tokio::spawn(session::heartbeat::run_heartbeat(
            Arc::clone(&self.registry),
            cfg.heartbeat_interval_seconds,
            self.shutdown.subscribe(),
        ));
        tokio::spawn(run_update_cleanup(
            Arc::clone(&self.delivery),
            cfg.update_retention_seconds,
            cfg.sweep_interval_seconds,
            self.shutdown.subscribe(),
        ));
        info!("gateway background tasks started");
    }

    /// Signals every background task to exit.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
        info!("gateway shutdown signalled");
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn delivery(&self) -> &Arc<DeliveryService> {
        &self.delivery
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    pub fn dispatcher(&self) -> &Arc<MessageDispatcher> {
        &self.dispatcher
    }

    pub fn bridge(&self) -> &Arc<LifecycleBridge> {
        &self.bridge
    }

    pub fn gatekeeper(&self) -> &Gatekeeper {
        &self.gatekeeper
    }
}

/// Periodically drops stale last-delivered bookkeeping entries.
async fn run_update_cleanup(
    delivery: Arc<DeliveryService>,
    retention_seconds: i64,
    interval_seconds: u64,
    mut shutdown: broadcast::Receiver<()>,
) {
    let retention = Duration::seconds(retention_seconds);
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_seconds));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = delivery.clear_old_updates(retention, Utc::now());
                if removed > 0 {
                    debug!(removed, "cleared stale update bookkeeping");
                }
            }
            _ = shutdown.recv() => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_engine_wires_from_default_config() {
        let engine = Arc::new(GatewayEngine::new(&AppConfig::default()));
        assert_eq!(engine.registry().count(), 0);
        assert_eq!(engine.pipeline().len(), 6);
        assert_eq!(engine.config().dispatch_workers, 10);

        engine.start_background_tasks();
        engine.shutdown();
    }
}
