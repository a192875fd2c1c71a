//! Rowpipe Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! The upload side of the pipeline: an S3 upload notification names a CSV
//! object, the object is fetched and parsed, and its rows are published to a
//! FIFO queue in batches of [`batch::CHUNK_SIZE`].
//!
//! # Flow
//!
//! 1. [`event`] turns the notification into bucket/key targets
//! 2. [`rowpipe_common::environment`] derives the environment tag
//! 3. [`storage`] fetches the object bytes
//! 4. [`parse`] yields header-keyed rows in file order
//! 5. [`batch`] buffers rows and flushes each full chunk to the queue
//!
//! [`handler::IngestHandler`] wires the steps together and produces the
//! `{statusCode, body}` response.

pub mod batch;
pub mod config;
pub mod error;
pub mod event;
pub mod handler;
pub mod parse;
pub mod storage;

pub use error::{IngestError, IngestResult};
pub use handler::IngestHandler;
