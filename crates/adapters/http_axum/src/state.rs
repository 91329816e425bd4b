//! Shared application state for axum handlers.

use std::sync::Arc;

use mailflow_app::ports::{AutomationRepository, EmailTransport, QueueRepository};
use mailflow_app::services::automation_service::AutomationService;
use mailflow_app::services::queue_inspector::QueueInspector;
use mailflow_app::services::queue_processor::QueueProcessor;
use mailflow_app::services::retry_manager::RetryManager;
use mailflow_app::services::trigger_router::TriggerRouter;

/// Application state shared across all axum handlers.
///
/// Generic over the automation repository, the queue repository and the
/// email transport to avoid dynamic dispatch. `Clone` is implemented
/// manually so the underlying types themselves do not need to be `Clone`.
pub struct AppState<A, Q, T> {
    /// Automation CRUD service.
    pub automation_service: Arc<AutomationService<A>>,
    /// Event routing and manual enrollment.
    pub trigger_router: Arc<TriggerRouter<A, Q>>,
    /// Queue processing, shared with the periodic worker.
    pub queue_processor: Arc<QueueProcessor<Q, T>>,
    /// Queue listing and statistics.
    pub queue_inspector: Arc<QueueInspector<Q>>,
    /// Manual retry and cancel.
    pub retry_manager: Arc<RetryManager<Q>>,
}

impl<A, Q, T> Clone for AppState<A, Q, T> {
    fn clone(&self) -> Self {
        Self {
            automation_service: Arc::clone(&self.automation_service),
            trigger_router: Arc::clone(&self.trigger_router),
            queue_processor: Arc::clone(&self.queue_processor),
            queue_inspector: Arc::clone(&self.queue_inspector),
            retry_manager: Arc::clone(&self.retry_manager),
        }
    }
}

impl<A, Q, T> AppState<A, Q, T>
where
    A: AutomationRepository + Clone + Send + Sync + 'static,
    Q: QueueRepository + Clone + Send + Sync + 'static,
    T: EmailTransport + Send + Sync + 'static,
{
    /// Build every service over the two repositories.
    ///
    /// The processor is passed pre-wrapped so it can also be handed to a
    /// background worker.
    pub fn new(automations: A, queue: Q, queue_processor: Arc<QueueProcessor<Q, T>>) -> Self {
        Self {
            automation_service: Arc::new(AutomationService::new(automations.clone())),
            trigger_router: Arc::new(TriggerRouter::new(automations, queue.clone())),
            queue_processor,
            queue_inspector: Arc::new(QueueInspector::new(queue.clone())),
            retry_manager: Arc::new(RetryManager::new(queue)),
        }
    }
}
