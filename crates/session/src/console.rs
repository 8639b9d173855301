//! Wiring for a running console: storage, client, session and gateway

use crate::context::{Redirector, SessionContext, TracingRedirector};
use crate::error::SessionError;
use crate::guard::RouteGuard;
use crate::state::SessionState;
use crate::validator::SessionValidator;
use admin_core::{AdminConfig, CredentialStorage, FileStorage, TokenStore};
use admin_http::{
    AuthGateway, CredentialRefresher, EndpointRefresher, NoRefresh, PublicAdminClient,
};
use std::sync::Arc;
use tracing::info;

/// A fully wired admin console
#[derive(Debug, Clone)]
pub struct AdminConsole {
    session: Arc<SessionContext>,
    gateway: AuthGateway,
}

impl AdminConsole {
    pub fn builder(config: AdminConfig) -> AdminConsoleBuilder {
        AdminConsoleBuilder {
            config,
            storage: None,
            redirector: None,
            refresher: None,
        }
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// Gateway for every authenticated call
    pub fn gateway(&self) -> &AuthGateway {
        &self.gateway
    }

    pub fn route_guard(&self) -> RouteGuard {
        self.session.route_guard()
    }

    /// Run the initial session check
    pub async fn start(&self) -> SessionState {
        self.session.initialize().await
    }

    pub fn shutdown(&self) {
        self.session.shutdown();
    }
}

pub struct AdminConsoleBuilder {
    config: AdminConfig,
    storage: Option<Arc<dyn CredentialStorage>>,
    redirector: Option<Arc<dyn Redirector>>,
    refresher: Option<Arc<dyn CredentialRefresher>>,
}

impl AdminConsoleBuilder {
    /// Where the credential is persisted. Defaults to a file in the data directory.
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn CredentialStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    #[must_use]
    pub fn redirector(mut self, redirector: Arc<dyn Redirector>) -> Self {
        self.redirector = Some(redirector);
        self
    }

    /// Override the renewal strategy chosen from `refresh_enabled`
    #[must_use]
    pub fn refresher(mut self, refresher: Arc<dyn CredentialRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn build(self) -> Result<AdminConsole, SessionError> {
        let config = self.config;
        let client = PublicAdminClient::from_config(&config)?;

        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(FileStorage::in_dir(config.data_dir())));
        let tokens = Arc::new(TokenStore::new(storage));

        let refresher = self.refresher.unwrap_or_else(|| {
            if config.refresh_enabled {
                Arc::new(EndpointRefresher::new(client.clone()))
            } else {
                Arc::new(NoRefresh)
            }
        });

        let validator = SessionValidator::new(client.clone()).with_leeway(config.expiry_leeway());
        let session = Arc::new(SessionContext::new(
            tokens.clone(),
            client.clone(),
            validator,
            self.redirector
                .unwrap_or_else(|| Arc::new(TracingRedirector)),
            config.login_route.clone(),
        ));

        let gateway = AuthGateway::builder(client, tokens)
            .refresher(refresher)
            .expiry_handler(session.clone())
            .build();

        info!(
            base_url = %config.base_url,
            refresh_enabled = config.refresh_enabled,
            "Admin console ready"
        );

        Ok(AdminConsole { session, gateway })
    }
}
