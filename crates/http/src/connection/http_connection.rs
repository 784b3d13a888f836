use http::StatusCode;
use tokio::io::AsyncWrite;
use tracing::{error, info, warn};

use crate::codec::{write_header, OutboundSink, WriteQueue};
use crate::config::{ConfigResolver, RequestConfig};
use crate::pipeline::RequestPipeline;
use crate::protocol::{HandlerResult, Request, RequestContext, SendError};
use crate::resolve::MetadataLookup;

/// One client connection driving its requests through a [`RequestPipeline`].
///
/// The connection owns the [`RequestContext`], which is reused for every
/// pipelined request, and the sink the header blocks are committed to.
///
/// # Type Parameters
///
/// * `S`: where serialized header blocks are committed
#[derive(Debug)]
pub struct HttpConnection<S> {
    ctx: RequestContext,
    sink: S,
}

impl<S> HttpConnection<S>
where
    S: OutboundSink,
{
    pub fn new(scheme: impl Into<String>, sink: S) -> Self {
        Self { ctx: RequestContext::new(scheme, RequestConfig::default()), sink }
    }

    pub fn context(&self) -> &RequestContext {
        &self.ctx
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Serves one request and commits its response header.
    ///
    /// Suspended stages are retried on later scheduler turns until the
    /// pipeline settles. Dropping the returned future abandons the request.
    ///
    /// Returns whether the connection stays persistent.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] if the header block could not be serialized.
    pub async fn serve<M, C>(&mut self, pipeline: &RequestPipeline<M, C>, request: Request) -> Result<bool, SendError>
    where
        M: MetadataLookup,
        C: ConfigResolver,
    {
        self.ctx.begin(request);

        let result = loop {
            match pipeline.prepare(&mut self.ctx) {
                HandlerResult::Suspend => tokio::task::yield_now().await,
                result => break result,
            }
        };

        if result == HandlerResult::Fault {
            error!(uri = %self.ctx.uri.path, "request failed, answering 500");
        } else if !self.ctx.is_decided() {
            warn!(uri = %self.ctx.uri.path, mode = ?self.ctx.mode, "no stage decided the response, answering 500");
            self.ctx.finish(StatusCode::INTERNAL_SERVER_ERROR);
        }

        write_header(&mut self.ctx, &mut self.sink)?;

        let keep_alive = self.ctx.conn.keep_alive;
        if !keep_alive {
            info!(requests = self.ctx.conn.request_count, "connection will be closed");
        }
        Ok(keep_alive)
    }
}

impl HttpConnection<WriteQueue> {
    /// Writes every committed chunk to `writer`.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] if writing to `writer` fails.
    pub async fn flush<W>(&mut self, writer: &mut W) -> Result<usize, SendError>
    where
        W: AsyncWrite + Unpin,
    {
        self.sink.write_to(writer).await
    }
}
