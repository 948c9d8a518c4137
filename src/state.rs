use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::{AccessTokens, ConfirmationCodes};
use crate::config::Config;
use crate::db::Store;
use crate::services::{HttpMailer, LogMailer, Mailer, SignupService};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub tokens: Arc<AccessTokens>,

    pub signup: Arc<SignupService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let tokens = Arc::new(AccessTokens::new(
            &config.auth.token_secret,
            i64::from(config.auth.token_ttl_hours) * 3600,
        ));

        let codes = ConfirmationCodes::new(
            &config.auth.token_secret,
            i64::from(config.auth.confirmation_ttl_hours) * 3600,
        );

        let mailer: Arc<dyn Mailer> = if config.mail.enabled {
            Arc::new(HttpMailer::new(&config.mail)?)
        } else {
            Arc::new(LogMailer)
        };

        let signup = Arc::new(SignupService::new(
            store.clone(),
            codes,
            AccessTokens::new(
                &config.auth.token_secret,
                i64::from(config.auth.token_ttl_hours) * 3600,
            ),
            mailer,
        ));

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            tokens,
            signup,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
