//! Transactional `users` upserts
//!
//! [`UserStore`] and [`UserTransaction`] are the seam between record
//! processing and MySQL. A pool is opened per invocation and environment
//! through a [`StoreFactory`] and closed when the invocation ends.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rowpipe_common::envelope::Row;
use sqlx::{
    mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions},
    MySql, Transaction,
};
use uuid::Uuid;

use crate::{
    config::PoolConfig,
    credentials::DbCredentials,
    error::{ConsumerError, ConsumerResult},
};

/// Insert a user, or on a key conflict only touch `updatedAt`.
pub const UPSERT_USER_SQL: &str = r#"
INSERT INTO users (id, name, createdAt, updatedAt)
VALUES (?, ?, ?, ?)
ON DUPLICATE KEY UPDATE updatedAt = ?
"#;

/// A user row ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub id: Uuid,
    pub name: String,
    pub timestamp: DateTime<Utc>,
}

impl NewUser {
    /// Build from a queue row; the row must carry a non-empty `name`
    ///
    /// The name is stored exactly as received.
    pub fn from_row(row: &Row) -> ConsumerResult<Self> {
        let name = row
            .get("name")
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ConsumerError::InvalidRecord("row has no name".to_string()))?;

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            timestamp: Utc::now(),
        })
    }
}

#[async_trait]
pub trait UserTransaction: Send {
    async fn upsert_user(&mut self, user: &NewUser) -> ConsumerResult<()>;
    async fn commit(self) -> ConsumerResult<()>;
    async fn rollback(self) -> ConsumerResult<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    type Tx: UserTransaction;

    /// Acquire a pooled connection and begin a transaction on it
    async fn begin(&self) -> ConsumerResult<Self::Tx>;

    /// Release every connection; the store is unusable afterwards
    async fn close(&self);
}

/// Opens a store for one environment's credentials
#[async_trait]
pub trait StoreFactory: Send + Sync {
    type Store: UserStore;

    async fn open(&self, credentials: &DbCredentials) -> ConsumerResult<Self::Store>;
}

/// Split `host:port` or `[v6]:port`; the port falls back to `default_port`
///
/// A bare IPv6 literal such as `::1` is returned whole.
pub fn split_host_port(host: &str, default_port: u16) -> (&str, u16) {
    if let Some((addr, rest)) = host.strip_prefix('[').and_then(|h| h.split_once(']')) {
        let port = rest
            .strip_prefix(':')
            .and_then(|port| port.parse().ok())
            .unwrap_or(default_port);
        return (addr, port);
    }

    match host.rsplit_once(':') {
        Some((name, port)) if !name.is_empty() && !name.contains(':') => match port.parse() {
            Ok(port) => (name, port),
            Err(_) => (host, default_port),
        },
        _ => (host, default_port),
    }
}

pub async fn create_pool(
    credentials: &DbCredentials,
    config: &PoolConfig,
) -> ConsumerResult<MySqlPool> {
    let (host, port) = split_host_port(&credentials.host, config.port);

    let options = MySqlConnectOptions::new()
        .host(host)
        .port(port)
        .username(&credentials.user)
        .password(&credentials.password)
        .database(&credentials.database);

    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(0)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_with(options)
        .await?;

    tracing::info!(
        host = %host,
        database = %credentials.database,
        max_connections = config.max_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

#[derive(Clone)]
pub struct MySqlUserStore {
    pool: MySqlPool,
}

impl MySqlUserStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

pub struct MySqlUserTransaction {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl UserTransaction for MySqlUserTransaction {
    async fn upsert_user(&mut self, user: &NewUser) -> ConsumerResult<()> {
        sqlx::query(UPSERT_USER_SQL)
            .bind(user.id.to_string())
            .bind(&user.name)
            .bind(user.timestamp)
            .bind(user.timestamp)
            .bind(user.timestamp)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self) -> ConsumerResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> ConsumerResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for MySqlUserStore {
    type Tx = MySqlUserTransaction;

    async fn begin(&self) -> ConsumerResult<Self::Tx> {
        Ok(MySqlUserTransaction {
            tx: self.pool.begin().await?,
        })
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("Database connection pool closed");
    }
}

/// Opens a fresh MySQL pool per call
#[derive(Debug, Clone, Default)]
pub struct MySqlStoreFactory {
    config: PoolConfig,
}

impl MySqlStoreFactory {
    pub fn new(config: PoolConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl StoreFactory for MySqlStoreFactory {
    type Store = MySqlUserStore;

    async fn open(&self, credentials: &DbCredentials) -> ConsumerResult<Self::Store> {
        Ok(MySqlUserStore::new(create_pool(credentials, &self.config).await?))
    }
}
