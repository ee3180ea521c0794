use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::Mailer;

/// Everything a request handler can reach, built once at startup and handed
/// to the router. Handlers never look anything up from ambient globals.
#[derive(Clone)]
pub struct SharedState {
    pub config: Config,

    pub store: Store,

    pub mailer: Arc<Mailer>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let mailer = Arc::new(Mailer::new(config.mail.clone())?);

        Ok(Self {
            config,
            store,
            mailer,
        })
    }
}
