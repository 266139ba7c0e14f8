use std::{ops::Deref, sync::Arc};

use crate::config::Config;
use crate::rejoin::{
    CounterStore, Enforcer, JsonFileBackend, Notifier, Warden, WardenResult, WebhookAudit,
};

/// Shared state handed to every command and event handler
#[derive(Clone)]
pub struct Data(pub Arc<DataInner>);

pub struct DataInner {
    pub warden: Warden,
    pub config: Config,
}

impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data")
            .field("config", &self.config)
            .field("store", self.warden.store())
            .finish()
    }
}

impl Deref for Data {
    type Target = DataInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Data {
    /// Wire the rejoin tracker from configuration and load stored counts
    ///
    /// # Errors
    ///
    /// Returns an error if the counter file exists but cannot be read.
    pub async fn load(config: Config) -> WardenResult<Self> {
        let backend = JsonFileBackend::new(&config.data_path);
        let store = CounterStore::load(Arc::new(backend)).await?;
        let notifier = Notifier::new(
            Arc::new(WebhookAudit::new(config.webhook_url.clone())),
            config.invite_url.clone(),
        );
        let enforcer = Enforcer::new(config.blacklist_role_id, config.kick_enabled);

        Ok(Self::new(Warden::new(store, notifier, enforcer), config))
    }

    #[must_use]
    pub fn new(warden: Warden, config: Config) -> Self {
        Self(Arc::new(DataInner { warden, config }))
    }
}
