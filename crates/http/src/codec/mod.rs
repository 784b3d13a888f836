//! Response header serialization and the outbound write path.
//!
//! # Architecture
//!
//! - [`HeaderEncoder`]: a [`tokio_util::codec::Encoder`] turning the response
//!   part of a [`RequestContext`] into the wire header block, settling
//!   connection persistence on the way
//! - [`OutboundSink`]: where the serialized block goes, staged and then committed
//! - [`WriteQueue`]: per-connection chunk queue flushed to any [`tokio::io::AsyncWrite`]
//!
//! [`write_header`] ties the pieces together.

mod header_encoder;
mod sink;

pub use header_encoder::HeaderEncoder;
pub use sink::OutboundSink;
pub use sink::WriteQueue;

use bytes::BytesMut;
use tokio_util::codec::Encoder;

use crate::protocol::{RequestContext, SendError};

/// Serializes the header block of `ctx` and commits it to `sink`.
///
/// # Errors
///
/// Returns [`SendError`] if the header block could not be serialized.
pub fn write_header<S>(ctx: &mut RequestContext, sink: &mut S) -> Result<usize, SendError>
where
    S: OutboundSink + ?Sized,
{
    let mut buf = BytesMut::new();
    HeaderEncoder::new().encode(ctx, &mut buf)?;
    sink.append(&buf);
    sink.commit();
    Ok(buf.len())
}
