//! Rowpipe Consumer Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! The queue side of the pipeline: a batch of delivered messages is grouped by
//! environment, each group's database credentials are resolved through a
//! process-wide [`credentials::CredentialCache`], and every record is upserted
//! into `users` in its own transaction.
//!
//! # Delivery guarantees
//!
//! A message is deleted inside its record's transaction, right before commit.
//! A record that fails is rolled back and its message stays on the queue for
//! redelivery, so rows are applied at least once; the upsert makes replays
//! harmless.
//!
//! # Concurrency
//!
//! Records run in windows of [`worker::CONCURRENCY_LIMIT`]. The pool opened
//! for each group must hold at least that many connections, which
//! [`config::ConsumerConfig::validate`] enforces.

pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod handler;
pub mod params;
pub mod records;
pub mod worker;

pub use error::{ConsumerError, ConsumerResult};
pub use handler::ConsumerHandler;
