//! Rowpipe Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the rowpipe functions.
//!
//! # Overview
//!
//! - **Error Handling**: [`PipelineError`] and the crate [`Result`] alias
//! - **Logging**: tracing subscriber setup shared by both Lambda binaries
//! - **Envelope**: the `{ data, env }` message body carried on the queue
//! - **Environment**: bucket name to deployment environment resolution
//! - **Queue**: FIFO publish/delete seams and their SQS implementation
//! - **Response**: the `{ statusCode, body }` result of every invocation
//!
//! # Example
//!
//! ```no_run
//! use rowpipe_common::envelope::{Envelope, Row};
//!
//! fn encode(row: Row) -> rowpipe_common::Result<String> {
//!     Envelope::new(row, "dev").to_body()
//! }
//! ```

pub mod envelope;
pub mod environment;
pub mod error;
pub mod logging;
pub mod queue;
pub mod response;

// Re-export commonly used types
pub use error::{PipelineError, Result};
pub use response::HandlerResponse;
