//! Per-connection request driver.
//!
//! # Components
//!
//! - [`HttpConnection`]: owns the connection's request context and outbound sink
//!   - Runs each request through the pipeline, yielding between suspended turns
//!   - Turns undecided or faulted requests into `500`
//!   - Commits the serialized header block and reports persistence

mod http_connection;

pub use http_connection::HttpConnection;
