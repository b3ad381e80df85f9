use std::sync::Arc;

use crate::config::AppConfig;
use crate::notify::Notifier;
use crate::services::{AccountService, AnalyticsService, GraphClient, PostService, SignupService, WorkflowService};
use crate::store::CredentialStore;

/// Shared by every request: the store, outbound clients and configuration
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub notifier: Arc<dyn Notifier>,
    pub graph: GraphClient,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
        graph: GraphClient,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            graph,
            config: Arc::new(config),
        }
    }

    pub fn signup(&self) -> SignupService {
        SignupService::new(self.store.clone(), self.notifier.clone())
    }

    pub fn accounts(&self) -> AccountService {
        AccountService::new(self.store.clone(), self.config.security.clone())
    }

    pub fn posts(&self) -> PostService {
        PostService::new(self.store.clone())
    }

    pub fn workflows(&self) -> WorkflowService {
        WorkflowService::new(self.store.clone())
    }

    pub fn analytics(&self) -> AnalyticsService {
        AnalyticsService::new(self.store.clone(), self.graph.clone())
    }
}
