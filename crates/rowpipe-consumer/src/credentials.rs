//! Per-environment database credentials
//!
//! Credentials live in the parameter store under `/{env}/MYSQL_HOST`,
//! `/{env}/MYSQL_USER`, `/{env}/MYSQL_PASSWORD` and `/{env}/MYSQL_DATABASE`.
//! They are fetched on first use of an environment and kept for the lifetime
//! of the process; rotating a credential requires a fresh process.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::{error::ConsumerResult, params::ParameterStore};

pub const HOST_PARAMETER: &str = "MYSQL_HOST";
pub const USER_PARAMETER: &str = "MYSQL_USER";
pub const PASSWORD_PARAMETER: &str = "MYSQL_PASSWORD";
pub const DATABASE_PARAMETER: &str = "MYSQL_DATABASE";

#[derive(Clone, PartialEq, Eq)]
pub struct DbCredentials {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl std::fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbCredentials")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

/// Full parameter name, e.g. `/dev/MYSQL_HOST` or `/rowpipe/dev/MYSQL_HOST`
pub fn parameter_name(prefix: &str, env: &str, parameter: &str) -> String {
    format!("{}/{}/{}", prefix, env, parameter)
}

/// Process-wide get-or-populate cache keyed by environment
///
/// Construct once per process and share it between invocations. Concurrent
/// misses for the same environment may both fetch and the last write wins.
#[derive(Debug, Default)]
pub struct CredentialCache {
    prefix: String,
    entries: RwLock<HashMap<String, DbCredentials>>,
}

impl CredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            entries: RwLock::default(),
        }
    }

    /// Cached credentials for `env`, without fetching
    pub async fn get(&self, env: &str) -> Option<DbCredentials> {
        self.entries.read().await.get(env).cloned()
    }

    #[instrument(skip(self, store))]
    pub async fn get_or_fetch(
        &self,
        env: &str,
        store: &dyn ParameterStore,
    ) -> ConsumerResult<DbCredentials> {
        if let Some(credentials) = self.get(env).await {
            debug!("Using cached database credentials");
            return Ok(credentials);
        }

        let name = |parameter| parameter_name(&self.prefix, env, parameter);
        let (host, user, password, database) = (
            name(HOST_PARAMETER),
            name(USER_PARAMETER),
            name(PASSWORD_PARAMETER),
            name(DATABASE_PARAMETER),
        );

        let (host, user, password, database) = tokio::try_join!(
            store.get_parameter(&host, true),
            store.get_parameter(&user, true),
            store.get_parameter(&password, true),
            store.get_parameter(&database, true),
        )?;

        let credentials = DbCredentials {
            host,
            user,
            password,
            database,
        };

        self.entries
            .write()
            .await
            .insert(env.to_string(), credentials.clone());

        info!(
            host = %credentials.host,
            database = %credentials.database,
            "Cached database credentials"
        );
        Ok(credentials)
    }
}
