use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::protocol::SendError;

/// Destination of a serialized header block.
///
/// Bytes handed to [`append`](OutboundSink::append) are staged; nothing is
/// visible to the transport until [`commit`](OutboundSink::commit) places the
/// staged block ahead of any queued body data.
pub trait OutboundSink {
    fn append(&mut self, bytes: &[u8]);

    fn commit(&mut self);
}

impl OutboundSink for BytesMut {
    fn append(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }

    fn commit(&mut self) {}
}

/// Per-connection queue of outgoing chunks.
///
/// Handlers may queue body chunks before the header block is known; the
/// committed header is always written first.
#[derive(Debug, Default)]
pub struct WriteQueue {
    staged: BytesMut,
    chunks: VecDeque<Bytes>,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a body chunk behind everything already queued.
    pub fn push_body(&mut self, chunk: Bytes) {
        if !chunk.is_empty() {
            self.chunks.push_back(chunk);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total bytes waiting to be written.
    pub fn len(&self) -> usize {
        self.chunks.iter().map(Bytes::len).sum()
    }

    /// Drops every queued chunk, e.g. when the response is replaced by an error.
    pub fn clear(&mut self) {
        self.staged.clear();
        self.chunks.clear();
    }

    /// Writes and drains every committed chunk, returning the number of bytes written.
    pub async fn write_to<W>(&mut self, writer: &mut W) -> Result<usize, SendError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut written = 0;
        while let Some(chunk) = self.chunks.pop_front() {
            writer.write_all(&chunk).await?;
            written += chunk.len();
        }
        writer.flush().await?;
        trace!(written, "flushed write queue");
        Ok(written)
    }
}

impl OutboundSink for WriteQueue {
    fn append(&mut self, bytes: &[u8]) {
        self.staged.extend_from_slice(bytes);
    }

    fn commit(&mut self) {
        if !self.staged.is_empty() {
            let header = self.staged.split().freeze();
            self.chunks.push_front(header);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn header_is_written_before_queued_body() {
        let mut queue = WriteQueue::new();
        queue.push_body(Bytes::from_static(b"hello"));
        queue.append(b"HTTP/1.1 200 OK\r\n");
        queue.append(b"\r\n");

        assert_eq!(queue.len(), 5);
        queue.commit();
        assert_eq!(queue.len(), 24);

        let mut out = Vec::new();
        let written = queue.write_to(&mut out).await.unwrap();

        assert_eq!(written, 24);
        assert_eq!(&out[..], b"HTTP/1.1 200 OK\r\n\r\nhello");
        assert!(queue.is_empty());
    }

    #[test]
    fn empty_commit_queues_nothing() {
        let mut queue = WriteQueue::new();
        queue.commit();
        queue.push_body(Bytes::new());
        assert!(queue.is_empty());
    }

    #[test]
    fn bytes_mut_appends_directly() {
        let mut buf = BytesMut::new();
        buf.append(b"abc");
        buf.commit();
        assert_eq!(&buf[..], b"abc");
    }
}
