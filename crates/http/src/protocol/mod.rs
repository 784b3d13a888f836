//! Core data model shared by every stage of request resolution.
//!
//! # Architecture
//!
//! - **Request Context** ([`context`]): the mutable state threaded through the pipeline
//!   - [`RequestContext`]: one per connection, reset for each fresh request
//!   - [`Request`]: the pre-parsed request line and framing facts
//!   - [`UriParts`] / [`Physical`]: the logical and the filesystem view of the target
//!   - [`Response`] / [`ConnectionState`]: the outcome and persistence bookkeeping
//!
//! - **Headers** ([`header`]): ordered response header collection
//!   - [`ResponseHeaders`]: duplicates permitted, insertion order kept
//!   - [`HeaderTags`]: presence flags for the well-known headers
//!
//! - **Stage outcome** ([`HandlerResult`]): Continue, Finished, Fault or Suspend
//!
//! - **Error Handling** ([`error`]):
//!   - [`ResolveError`]: terminal outcomes, each mapped to a response status
//!   - [`NormalizeError`]: request-target rejection reasons
//!   - [`SendError`]: failures while flushing the write queue

mod context;
pub use context::ConnectionState;
pub use context::Mode;
pub use context::Physical;
pub use context::Request;
pub use context::RequestContext;
pub use context::Response;
pub use context::UriParts;

mod header;
pub use header::HeaderField;
pub use header::HeaderTags;
pub use header::ResponseHeaders;

mod handler_result;
pub use handler_result::HandlerResult;

mod error;
pub use error::NormalizeError;
pub use error::ResolveError;
pub use error::SendError;
