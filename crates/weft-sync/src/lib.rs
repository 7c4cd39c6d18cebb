//! Weft Sync - synchronizing streams through an authoritative log
//!
//! A log server orders operations from many clients and assigns each a
//! version. Clients keep a local [`weft_stream::Stream`] and a [`Session`]
//! that moves edits between the two:
//!
//! - [`Operation`]: a change with an id, parent, version and basis
//! - [`Transformer`]: rebases log operations made against older versions
//! - [`Session`]: push/pull with at most one of each in flight
//! - [`Connection`]: the log contract, with [`MemoryLog`] in process and
//!   [`HttpConnection`] speaking the tagged JSON protocol to a [`Server`]
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use weft_core::{Splice, Value};
//! use weft_stream::Stream;
//! use weft_sync::{MemoryLog, Session};
//!
//! # tokio_test::block_on(async {
//! let log = Arc::new(MemoryLog::new());
//! let alice = Session::new(Arc::clone(&log), Stream::new(Value::text("")));
//! let bob = Session::new(Arc::clone(&log), Stream::new(Value::text("")));
//!
//! alice.stream().append(Splice::new(0, Value::text(""), Value::text("hi")).into());
//! alice.push().await.unwrap();
//! bob.pull().await.unwrap();
//!
//! assert_eq!(bob.stream().latest().value(), &Value::text("hi"));
//! assert_eq!(bob.version(), 0);
//! # });
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod memory;
pub mod operation;
pub mod protocol;
pub mod session;
pub mod transformer;

pub use config::{SessionConfig, SessionConfigBuilder};
pub use connection::Connection;
pub use error::{Result, SyncError};
pub use memory::MemoryLog;
pub use operation::{decode_ops, encode_ops, IdSource, Operation, UlidIds, OPERATION_TAG};
pub use protocol::{HttpConnection, Request, Response, Server, Transport, CONTENT_TYPE};
pub use session::{Session, Snapshot, SyncHandle};
pub use transformer::Transformer;
