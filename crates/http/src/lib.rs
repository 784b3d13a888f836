//! Request resolution core of a micro HTTP server.
//!
//! This crate takes a parsed request line and decides how it is answered:
//! the request-target is normalized, handed through plugin hooks, mapped onto
//! the filesystem (splitting off PATHINFO), and finally the response header
//! block is serialized with connection persistence settled.
//!
//! # Example
//!
//! ```no_run
//! use micro_httpd::codec::WriteQueue;
//! use micro_httpd::config::{ServerConfig, StaticConfigResolver};
//! use micro_httpd::connection::HttpConnection;
//! use micro_httpd::pipeline::RequestPipeline;
//! use micro_httpd::plugin::PluginChain;
//! use micro_httpd::protocol::Request;
//! use micro_httpd::resolve::FsMetadata;
//! use tokio::net::TcpStream;
//!
//! async fn answer(mut stream: TcpStream) -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig { document_root: "/srv/www".to_string(), ..ServerConfig::default() };
//!     let pipeline = RequestPipeline::new(PluginChain::new(), FsMetadata, StaticConfigResolver::new(&config));
//!
//!     let mut connection = HttpConnection::new("http", WriteQueue::new());
//!     let request = Request::get("/index.html").with_host("example.com");
//!     let keep_alive = connection.serve(&pipeline, request).await?;
//!     connection.flush(&mut stream).await?;
//!
//!     if !keep_alive {
//!         return Ok(());
//!     }
//!     // read the next request...
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: request context, response headers, stage results and errors
//! - [`uri`]: request-target normalization and decomposition
//! - [`plugin`]: the hook trait and the ordered plugin chain
//! - [`resolve`]: filesystem metadata seam and the PATHINFO splitter
//! - [`pipeline`]: the resumable stage state machine
//! - [`codec`]: response header serialization and the write queue
//! - [`date`]: process-wide `Date` header cache
//! - [`config`]: server configuration and per-request settings
//! - [`connection`]: async per-connection driver
//!
//! # Suspension
//!
//! No stage ever blocks. A plugin or metadata lookup that has to wait answers
//! `Suspend`; the pipeline records where it stopped in the request context
//! and the connection driver calls it again on a later scheduler turn.

pub mod codec;
pub mod config;
pub mod connection;
pub mod date;
pub mod pipeline;
pub mod plugin;
pub mod protocol;
pub mod resolve;
pub mod uri;

mod utils;
pub(crate) use utils::ensure;
